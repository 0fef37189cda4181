//! Generators and their invocation.
//!
//! A generator turns the resolved dependency graph into build-system glue
//! files. The host owns a [`GeneratorRegistry`]; recipes only name entries in
//! it. [`invoke_generators`] runs every declared generator once, in
//! declaration order, and keeps going past failures so the caller sees all of
//! them at once.

mod cmake_deps;
mod cmake_toolchain;
mod deps_json;

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::graph::DependencyGraph;
use crate::recipe::RecipeConfig;
use crate::settings::SettingsMatrix;

pub use cmake_deps::CMakeDeps;
pub use cmake_toolchain::{CMakeToolchain, TOOLCHAIN_FILE};
pub use deps_json::{DEPS_JSON_FILE, DepsJson};

/// Header line placed at the top of every generated file.
pub(crate) fn banner(comment: &str, recipe: &RecipeConfig) -> String {
  format!("{} Generated by recipekit for {}. Do not edit.\n", comment, recipe.reference())
}

/// Everything a generator may read.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorContext<'a> {
  pub recipe: &'a RecipeConfig,
  /// Restricted to the recipe's declared axes.
  pub settings: &'a SettingsMatrix,
  pub graph: &'a DependencyGraph,
  pub output_dir: &'a Path,
}

impl GeneratorContext<'_> {
  /// Write `content` to `file_name` under the output directory.
  pub fn write(&self, file_name: &str, content: &str) -> Result<PathBuf, GeneratorError> {
    fs::create_dir_all(self.output_dir).map_err(|source| GeneratorError::Io {
      path: self.output_dir.to_path_buf(),
      source,
    })?;
    let path = self.output_dir.join(file_name);
    fs::write(&path, content).map_err(|source| GeneratorError::Io {
      path: path.clone(),
      source,
    })?;
    debug!(path = ?path, bytes = content.len(), "wrote generated file");
    Ok(path)
  }
}

#[derive(Debug, Error)]
pub enum GeneratorError {
  #[error("failed to write {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to serialize: {0}")]
  Serialize(#[from] serde_json::Error),

  #[error("{0}")]
  Failed(String),
}

pub trait Generator: Send + Sync {
  fn name(&self) -> &str;

  /// Emit files into `ctx.output_dir`, returning the paths written.
  fn generate(&self, ctx: &GeneratorContext<'_>) -> Result<Vec<PathBuf>, GeneratorError>;
}

/// Generators known to a host, by name.
#[derive(Clone, Default)]
pub struct GeneratorRegistry {
  generators: BTreeMap<String, Arc<dyn Generator>>,
}

impl GeneratorRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// `CMakeToolchain`, `CMakeDeps` and `DepsJson`.
  pub fn with_builtins() -> Self {
    let mut registry = Self::new();
    registry.register(CMakeToolchain).register(CMakeDeps).register(DepsJson);
    registry
  }

  pub fn register<G: Generator + 'static>(&mut self, generator: G) -> &mut Self {
    self.register_arc(Arc::new(generator))
  }

  pub fn register_arc(&mut self, generator: Arc<dyn Generator>) -> &mut Self {
    let name = generator.name().to_string();
    if self.generators.insert(name.clone(), generator).is_some() {
      debug!(generator = %name, "replaced generator");
    }
    self
  }

  pub fn get(&self, name: &str) -> Option<&Arc<dyn Generator>> {
    self.generators.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.generators.contains_key(name)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.generators.keys().map(String::as_str)
  }

  /// Reject every declared name the registry does not know.
  pub fn validate(&self, recipe: &str, declared: &[String]) -> Result<(), ConfigError> {
    let errors = declared
      .iter()
      .filter(|name| !self.contains(name))
      .map(|name| ConfigError::UnknownGenerator {
        recipe: recipe.to_string(),
        generator: name.clone(),
      })
      .collect();
    match ConfigError::from_list(errors) {
      Some(err) => Err(err),
      None => Ok(()),
    }
  }
}

impl fmt::Debug for GeneratorRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("GeneratorRegistry")
      .field("generators", &self.generators.keys().collect::<Vec<_>>())
      .finish()
  }
}

/// Files written by one generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratorReport {
  pub generator: String,
  pub files: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct GeneratorFailure {
  pub generator: String,
  pub error: GeneratorError,
}

/// Every generator that failed during one invocation, plus what the others
/// managed to write.
#[derive(Debug, Error)]
#[error("{} generator(s) failed: {}", .failures.len(), describe(.failures))]
pub struct GeneratorFailures {
  pub failures: Vec<GeneratorFailure>,
  pub succeeded: Vec<GeneratorReport>,
}

impl GeneratorFailures {
  pub fn failed_names(&self) -> Vec<&str> {
    self.failures.iter().map(|f| f.generator.as_str()).collect()
  }
}

fn describe(failures: &[GeneratorFailure]) -> String {
  failures
    .iter()
    .map(|f| format!("{}: {}", f.generator, f.error))
    .collect::<Vec<_>>()
    .join("; ")
}

/// Run each generator in `names` once, in order.
pub fn invoke_generators(
  registry: &GeneratorRegistry,
  names: &[String],
  ctx: &GeneratorContext<'_>,
) -> Result<Vec<GeneratorReport>, GeneratorFailures> {
  let mut succeeded = Vec::new();
  let mut failures = Vec::new();

  for name in names {
    let Some(generator) = registry.get(name) else {
      failures.push(GeneratorFailure {
        generator: name.clone(),
        error: GeneratorError::Failed("not registered with this host".to_string()),
      });
      continue;
    };

    info!(generator = %name, output = ?ctx.output_dir, "running generator");
    match generator.generate(ctx) {
      Ok(files) => succeeded.push(GeneratorReport {
        generator: name.clone(),
        files,
      }),
      Err(error) => {
        warn!(generator = %name, error = %error, "generator failed");
        failures.push(GeneratorFailure {
          generator: name.clone(),
          error,
        });
      }
    }
  }

  if failures.is_empty() {
    Ok(succeeded)
  } else {
    Err(GeneratorFailures { failures, succeeded })
  }
}

/// Forward-slash rendering of a path, for build-system files.
pub(crate) fn portable(path: &Path) -> String {
  path.to_string_lossy().replace('\\', "/")
}
