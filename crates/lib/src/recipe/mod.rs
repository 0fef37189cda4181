//! The recipe object model.
//!
//! A recipe is an immutable [`RecipeConfig`] (identity, settings axes,
//! generators) plus an optional set of hooks. Hooks are modelled as
//! capabilities: a recipe hands out a [`HasRequirements`], [`HasSource`] or
//! [`HasLayout`] view of itself when it implements that hook, and the host
//! records which ones exist once, at load time.

mod layout;
mod manifest;
mod registry;
mod requirement;
mod source;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub use layout::Layout;
pub use manifest::{CmakeLayoutDecl, LayoutDecl, ManifestRecipe, RecipeFile, RecipeSection, SourceDecl};
pub use registry::{RecipeFactory, RecipeRegistry};
pub use requirement::{PackageRef, Requirement, Requirements, Version, VersionConstraint};
pub use source::{SourceCtx, SourceFetchSpec};

/// Static declarations read by the host before any hook runs.
///
/// `settings` and `generators` are ordered sets: duplicates are dropped,
/// keeping the first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeConfig {
  name: String,
  version: String,
  settings: Vec<String>,
  generators: Vec<String>,
}

impl RecipeConfig {
  pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      version: version.into(),
      settings: Vec::new(),
      generators: Vec::new(),
    }
  }

  pub fn settings<I, S>(mut self, axes: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    for axis in axes {
      push_unique(&mut self.settings, axis.into());
    }
    self
  }

  pub fn generators<I, S>(mut self, names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    for name in names {
      push_unique(&mut self.generators, name.into());
    }
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn version(&self) -> &str {
    &self.version
  }

  pub fn declared_settings(&self) -> &[String] {
    &self.settings
  }

  pub fn declared_generators(&self) -> &[String] {
    &self.generators
  }

  /// `name/version`
  pub fn reference(&self) -> String {
    format!("{}/{}", self.name, self.version)
  }

  /// Check the identity is usable as a package reference.
  pub fn validate_identity(&self) -> Result<(), ConfigError> {
    let reference = self.reference();
    PackageRef::parse(&reference).map(|_| ()).map_err(|reason| ConfigError::InvalidIdentity {
      identity: reference,
      reason,
    })
  }
}

fn push_unique(list: &mut Vec<String>, item: String) {
  if !list.contains(&item) {
    list.push(item);
  }
}

/// The `requirements` hook.
pub trait HasRequirements {
  fn requirements(&self, reqs: &mut Requirements);
}

/// The `source` hook.
pub trait HasSource {
  fn source(&self, ctx: &mut SourceCtx);
}

/// The `layout` hook.
pub trait HasLayout {
  fn layout(&self, layout: &mut Layout);
}

/// A package recipe.
///
/// Only [`Recipe::config`] is mandatory; the `as_*` accessors advertise
/// which hooks the recipe implements.
///
/// ```ignore
/// struct Compressor { config: RecipeConfig }
///
/// impl Recipe for Compressor {
///   fn config(&self) -> &RecipeConfig { &self.config }
///   fn as_requirements(&self) -> Option<&dyn HasRequirements> { Some(self) }
/// }
///
/// impl HasRequirements for Compressor {
///   fn requirements(&self, reqs: &mut Requirements) {
///     reqs.requires("exprtk/0.0.2");
///   }
/// }
/// ```
pub trait Recipe: Send + Sync {
  fn config(&self) -> &RecipeConfig;

  fn as_requirements(&self) -> Option<&dyn HasRequirements> {
    None
  }

  fn as_source(&self) -> Option<&dyn HasSource> {
    None
  }

  fn as_layout(&self) -> Option<&dyn HasLayout> {
    None
  }
}

/// The hooks a loaded recipe provides, captured once at load time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
  pub requirements: bool,
  pub source: bool,
  pub layout: bool,
}

impl Capabilities {
  pub fn of(recipe: &dyn Recipe) -> Self {
    Self {
      requirements: recipe.as_requirements().is_some(),
      source: recipe.as_source().is_some(),
      layout: recipe.as_layout().is_some(),
    }
  }
}

impl fmt::Display for Capabilities {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let names: Vec<&str> = [
      (self.layout, "layout"),
      (self.requirements, "requirements"),
      (self.source, "source"),
    ]
    .into_iter()
    .filter_map(|(present, name)| present.then_some(name))
    .collect();
    if names.is_empty() {
      write!(f, "none")
    } else {
      write!(f, "{}", names.join(", "))
    }
  }
}
