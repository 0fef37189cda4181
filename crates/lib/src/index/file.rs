//! A package index stored as TOML.
//!
//! ```toml
//! [[package]]
//! name = "exprtk"
//! version = "0.0.2"
//! package_folder = "packages/exprtk-0.0.2"
//! libs = []
//! requires = []
//! ```
//!
//! Relative `package_folder`s resolve against the directory holding the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{MemoryIndex, PackageIndex, PackageRecord};
use crate::error::ConfigError;
use crate::recipe::Requirement;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct IndexFile {
  #[serde(default, rename = "package")]
  packages: Vec<PackageRecord>,
}

#[derive(Debug, Clone)]
pub struct FileIndex {
  path: PathBuf,
  inner: MemoryIndex,
}

impl FileIndex {
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::parse(&content, path)
  }

  /// Parse index TOML as if it were read from `path`.
  pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
    let file: IndexFile = toml::from_str(content).map_err(|e| ConfigError::Parse {
      path: path.to_path_buf(),
      message: e.to_string(),
    })?;

    let base = path.parent().unwrap_or(Path::new(""));
    let mut errors = Vec::new();
    let mut inner = MemoryIndex::new();
    for mut record in file.packages {
      errors.extend(record.requires.iter().filter_map(|r| Requirement::parse(r).err()));
      if record.package_folder.is_relative() {
        record.package_folder = base.join(&record.package_folder);
      }
      inner.insert(record);
    }
    if let Some(err) = ConfigError::from_list(errors) {
      return Err(err);
    }

    debug!(path = ?path, packages = inner.len(), "loaded package index");
    Ok(Self {
      path: path.to_path_buf(),
      inner,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn records(&self) -> impl Iterator<Item = &PackageRecord> {
    self.inner.records()
  }
}

impl PackageIndex for FileIndex {
  fn candidates(&self, name: &str) -> Vec<&PackageRecord> {
    self.inner.candidates(name)
  }
}
