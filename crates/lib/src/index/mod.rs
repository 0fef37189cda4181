//! Package indexes consulted during dependency resolution.
//!
//! An index is always passed in explicitly; there is no process-wide
//! registry of packages.

mod file;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::recipe::Version;

pub use file::FileIndex;

/// One installable package version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
  pub name: String,
  pub version: String,
  /// Root of the package on disk.
  pub package_folder: PathBuf,
  /// Relative to `package_folder`.
  #[serde(default = "default_include_dirs")]
  pub include_dirs: Vec<PathBuf>,
  /// Relative to `package_folder`.
  #[serde(default = "default_lib_dirs")]
  pub lib_dirs: Vec<PathBuf>,
  #[serde(default)]
  pub libs: Vec<String>,
  #[serde(default)]
  pub defines: Vec<String>,
  /// References in the same syntax a recipe's `requires` uses.
  #[serde(default)]
  pub requires: Vec<String>,
}

fn default_include_dirs() -> Vec<PathBuf> {
  vec![PathBuf::from("include")]
}

fn default_lib_dirs() -> Vec<PathBuf> {
  vec![PathBuf::from("lib")]
}

impl PackageRecord {
  pub fn new(name: impl Into<String>, version: impl Into<String>, package_folder: impl Into<PathBuf>) -> Self {
    Self {
      name: name.into(),
      version: version.into(),
      package_folder: package_folder.into(),
      include_dirs: default_include_dirs(),
      lib_dirs: default_lib_dirs(),
      libs: Vec::new(),
      defines: Vec::new(),
      requires: Vec::new(),
    }
  }

  pub fn requires<I, S>(mut self, references: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.requires.extend(references.into_iter().map(Into::into));
    self
  }

  pub fn libs<I, S>(mut self, libs: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.libs.extend(libs.into_iter().map(Into::into));
    self
  }

  pub fn parsed_version(&self) -> Version {
    Version::parse(&self.version)
  }

  /// `name/version`
  pub fn reference(&self) -> String {
    format!("{}/{}", self.name, self.version)
  }

  pub fn include_paths(&self) -> Vec<PathBuf> {
    self.include_dirs.iter().map(|d| self.package_folder.join(d)).collect()
  }

  pub fn lib_paths(&self) -> Vec<PathBuf> {
    self.lib_dirs.iter().map(|d| self.package_folder.join(d)).collect()
  }
}

/// Source of [`PackageRecord`]s.
pub trait PackageIndex: Send + Sync {
  /// Every known version of `name`, in no particular order.
  fn candidates(&self, name: &str) -> Vec<&PackageRecord>;
}

/// An index held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
  packages: BTreeMap<String, Vec<PackageRecord>>,
}

impl MemoryIndex {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a record; an existing record with the same name and version is
  /// replaced.
  pub fn insert(&mut self, record: PackageRecord) -> &mut Self {
    let versions = self.packages.entry(record.name.clone()).or_default();
    versions.retain(|existing| existing.version != record.version);
    versions.push(record);
    self
  }

  pub fn with(mut self, record: PackageRecord) -> Self {
    self.insert(record);
    self
  }

  pub fn len(&self) -> usize {
    self.packages.values().map(Vec::len).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.packages.is_empty()
  }

  pub fn records(&self) -> impl Iterator<Item = &PackageRecord> {
    self.packages.values().flatten()
  }
}

impl PackageIndex for MemoryIndex {
  fn candidates(&self, name: &str) -> Vec<&PackageRecord> {
    self.packages.get(name).map(|v| v.iter().collect()).unwrap_or_default()
  }
}
