mod common;
mod install_tests;
