use std::path::PathBuf;

use serde::Serialize;

use super::{Generator, GeneratorContext, GeneratorError};
use crate::settings::SettingsMatrix;

pub const DEPS_JSON_FILE: &str = "recipekit_deps.json";

/// Writes the resolved graph as JSON for tooling that does not speak CMake.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepsJson;

#[derive(Debug, Serialize)]
struct Document<'a> {
  recipe: RecipeEntry<'a>,
  settings: &'a SettingsMatrix,
  packages: Vec<PackageEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct RecipeEntry<'a> {
  name: &'a str,
  version: &'a str,
}

#[derive(Debug, Serialize)]
struct PackageEntry<'a> {
  name: &'a str,
  version: &'a str,
  direct: bool,
  package_folder: &'a std::path::Path,
  include_dirs: Vec<PathBuf>,
  lib_dirs: Vec<PathBuf>,
  libs: &'a [String],
  defines: &'a [String],
  dependencies: Vec<&'a str>,
}

impl Generator for DepsJson {
  fn name(&self) -> &str {
    "DepsJson"
  }

  fn generate(&self, ctx: &GeneratorContext<'_>) -> Result<Vec<PathBuf>, GeneratorError> {
    let packages = ctx
      .graph
      .packages()
      .map(|record| PackageEntry {
        name: &record.name,
        version: &record.version,
        direct: ctx.graph.is_direct(&record.name),
        package_folder: &record.package_folder,
        include_dirs: record.include_paths(),
        lib_dirs: record.lib_paths(),
        libs: &record.libs,
        defines: &record.defines,
        dependencies: ctx.graph.dependencies_of(&record.name),
      })
      .collect();

    let doc = Document {
      recipe: RecipeEntry {
        name: ctx.recipe.name(),
        version: ctx.recipe.version(),
      },
      settings: ctx.settings,
      packages,
    };
    let json = serde_json::to_string_pretty(&doc)?;
    Ok(vec![ctx.write(DEPS_JSON_FILE, &json)?])
  }
}
