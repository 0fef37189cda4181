mod common;
mod host_tests;
mod scenario_tests;
mod source_tests;
