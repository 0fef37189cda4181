//! recipekit-lib: a small recipe engine for package manifests.
//!
//! This crate provides the pieces a host runtime needs to make a package
//! recipe meaningful:
//! - `recipe`: the recipe object model, hook capabilities and the registry
//! - `settings`: the settings axis vocabulary, bound matrices and profiles
//! - `fetch`: downloading and materializing source archives
//! - `index` / `graph`: explicit package index and dependency resolution
//! - `generate`: generator registry and built-in toolchain emitters
//! - `lifecycle`: the per-invocation state machine driving the hooks
//! - `host`: a host runtime wiring all of the above together

pub mod consts;
pub mod error;
pub mod fetch;
pub mod generate;
pub mod graph;
pub mod host;
pub mod index;
pub mod lifecycle;
pub mod platform;
pub mod recipe;
pub mod settings;
pub mod util;

pub use error::ConfigError;
