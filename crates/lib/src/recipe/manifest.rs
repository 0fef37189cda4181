//! Declarative recipes read from `recipe.toml`.
//!
//! ```toml
//! [recipe]
//! name = "compressor"
//! version = "0.1.0"
//! settings = ["os", "compiler", "build_type", "arch"]
//! generators = ["CMakeToolchain", "CMakeDeps"]
//! requires = ["exprtk/0.0.2"]
//!
//! [[source]]
//! url = "https://www.partow.net/downloads/exprtk_complex.zip"
//! destination = "."
//!
//! [layout]
//! cmake = { src_folder = "dependencies" }
//! ```
//!
//! `destination` is relative to the layout's source folder, so the archive
//! above lands in `dependencies/`.
//!
//! Hooks exist only for the sections present: no `requires` means no
//! `requirements` hook, no `[[source]]` means no `source` hook, and no
//! `[layout]` table leaves the host default layout in place.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{HasLayout, HasRequirements, HasSource, Layout, Recipe, RecipeConfig, Requirements, SourceCtx, SourceFetchSpec};
use crate::error::ConfigError;
use crate::platform::paths;

/// On-disk shape of `recipe.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeFile {
  pub recipe: RecipeSection,
  #[serde(default, rename = "source", skip_serializing_if = "Vec::is_empty")]
  pub sources: Vec<SourceDecl>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub layout: Option<LayoutDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeSection {
  pub name: String,
  pub version: String,
  #[serde(default)]
  pub settings: Vec<String>,
  #[serde(default)]
  pub generators: Vec<String>,
  #[serde(default)]
  pub requires: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceDecl {
  pub url: String,
  pub destination: PathBuf,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sha256: Option<String>,
  #[serde(default)]
  pub strip_root: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutDecl {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cmake: Option<CmakeLayoutDecl>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_folder: Option<PathBuf>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub build_folder: Option<PathBuf>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub generators_folder: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CmakeLayoutDecl {
  pub src_folder: PathBuf,
}

impl LayoutDecl {
  /// Every folder must resolve below the recipe root.
  pub fn validate(&self) -> Result<(), ConfigError> {
    let folders = [
      ("cmake.src_folder", self.cmake.as_ref().map(|c| &c.src_folder)),
      ("source_folder", self.source_folder.as_ref()),
      ("build_folder", self.build_folder.as_ref()),
      ("generators_folder", self.generators_folder.as_ref()),
    ];
    let errors = folders
      .into_iter()
      .filter_map(|(field, folder)| folder.map(|f| (field, f)))
      .filter(|(_, folder)| !paths::is_contained(folder))
      .map(|(field, folder)| ConfigError::InvalidLayoutFolder {
        field,
        folder: folder.display().to_string(),
      })
      .collect();
    match ConfigError::from_list(errors) {
      Some(err) => Err(err),
      None => Ok(()),
    }
  }
}

/// A recipe backed by a [`RecipeFile`].
#[derive(Debug, Clone)]
pub struct ManifestRecipe {
  config: RecipeConfig,
  file: RecipeFile,
}

impl ManifestRecipe {
  /// Read and parse a recipe file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::parse(&content, path)
  }

  /// Parse recipe TOML; `origin` is only used for error messages.
  pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
    let file: RecipeFile = toml::from_str(content).map_err(|e| ConfigError::Parse {
      path: origin.to_path_buf(),
      message: e.to_string(),
    })?;
    Self::from_file(file)
  }

  /// Fails when a `[layout]` folder is absolute or climbs out of the root.
  pub fn from_file(file: RecipeFile) -> Result<Self, ConfigError> {
    if let Some(layout) = &file.layout {
      layout.validate()?;
    }
    let config = RecipeConfig::new(&file.recipe.name, &file.recipe.version)
      .settings(file.recipe.settings.iter().cloned())
      .generators(file.recipe.generators.iter().cloned());
    Ok(Self { config, file })
  }

  pub fn file(&self) -> &RecipeFile {
    &self.file
  }
}

impl Recipe for ManifestRecipe {
  fn config(&self) -> &RecipeConfig {
    &self.config
  }

  fn as_requirements(&self) -> Option<&dyn HasRequirements> {
    (!self.file.recipe.requires.is_empty()).then_some(self as &dyn HasRequirements)
  }

  fn as_source(&self) -> Option<&dyn HasSource> {
    (!self.file.sources.is_empty()).then_some(self as &dyn HasSource)
  }

  fn as_layout(&self) -> Option<&dyn HasLayout> {
    self.file.layout.as_ref().map(|_| self as &dyn HasLayout)
  }
}

impl HasRequirements for ManifestRecipe {
  fn requirements(&self, reqs: &mut Requirements) {
    for reference in &self.file.recipe.requires {
      reqs.requires(reference);
    }
  }
}

impl HasSource for ManifestRecipe {
  fn source(&self, ctx: &mut SourceCtx) {
    for decl in &self.file.sources {
      let mut spec = SourceFetchSpec::new(&decl.url, &decl.destination).strip_root(decl.strip_root);
      if let Some(sha) = &decl.sha256 {
        spec = spec.sha256(sha);
      }
      ctx.fetch(spec);
    }
  }
}

impl HasLayout for ManifestRecipe {
  fn layout(&self, layout: &mut Layout) {
    let Some(decl) = &self.file.layout else {
      return;
    };
    if let Some(cmake) = &decl.cmake {
      layout.cmake_layout(&cmake.src_folder);
    }
    let root = layout.root().to_path_buf();
    if let Some(folder) = &decl.source_folder {
      layout.source_folder = root.join(folder);
    }
    if let Some(folder) = &decl.build_folder {
      layout.build_folder = root.join(folder);
    }
    if let Some(folder) = &decl.generators_folder {
      layout.generators_folder = root.join(folder);
    }
  }
}
