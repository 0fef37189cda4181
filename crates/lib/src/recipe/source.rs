//! The `source` hook context.
//!
//! The hook does not download anything itself: it records
//! [`SourceFetchSpec`]s and the lifecycle hands them to an archive fetcher
//! once the hook has returned.

use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::Serialize;

use crate::error::ConfigError;
use crate::platform::paths;
use crate::settings::SettingsMatrix;

/// One archive to retrieve into the dependency tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFetchSpec {
  pub url: String,
  /// Relative to the layout's source folder.
  pub destination: PathBuf,
  /// Expected sha256 (hex) of the downloaded archive.
  pub sha256: Option<String>,
  /// Drop the single top-level directory of the archive.
  pub strip_root: bool,
}

impl SourceFetchSpec {
  pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
    Self {
      url: url.into(),
      destination: destination.into(),
      sha256: None,
      strip_root: false,
    }
  }

  pub fn sha256(mut self, sha256: impl Into<String>) -> Self {
    self.sha256 = Some(sha256.into());
    self
  }

  pub fn strip_root(mut self, strip_root: bool) -> Self {
    self.strip_root = strip_root;
    self
  }

  /// Check url and destination without touching the network or disk.
  pub fn validate(&self) -> Result<(), ConfigError> {
    let url = Url::parse(&self.url).map_err(|e| ConfigError::InvalidSourceUrl {
      url: self.url.clone(),
      reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
      return Err(ConfigError::InvalidSourceUrl {
        url: self.url.clone(),
        reason: format!("unsupported scheme '{}'", url.scheme()),
      });
    }
    if url.host_str().is_none_or(str::is_empty) {
      return Err(ConfigError::InvalidSourceUrl {
        url: self.url.clone(),
        reason: "missing host".to_string(),
      });
    }

    if !paths::is_contained(&self.destination) {
      return Err(ConfigError::InvalidDestination {
        destination: self.destination.display().to_string(),
        reason: "must be a non-empty path inside the source folder".to_string(),
      });
    }

    if let Some(sha) = &self.sha256
      && (sha.trim().len() != 64 || !sha.trim().bytes().all(|b| b.is_ascii_hexdigit()))
    {
      return Err(ConfigError::InvalidSourceUrl {
        url: self.url.clone(),
        reason: format!("sha256 '{}' is not a 64 character hex digest", sha),
      });
    }
    Ok(())
  }

  /// Absolute destination under `source_folder`. A destination of `.`
  /// is the source folder itself.
  pub fn resolve(&self, source_folder: &Path) -> PathBuf {
    paths::normalize(&source_folder.join(&self.destination))
  }
}

/// Context handed to the `source` hook.
#[derive(Debug)]
pub struct SourceCtx {
  settings: SettingsMatrix,
  source_folder: PathBuf,
  specs: Vec<SourceFetchSpec>,
}

impl SourceCtx {
  pub fn new(settings: SettingsMatrix, source_folder: PathBuf) -> Self {
    Self {
      settings,
      source_folder,
      specs: Vec::new(),
    }
  }

  pub fn settings(&self) -> &SettingsMatrix {
    &self.settings
  }

  pub fn source_folder(&self) -> &Path {
    &self.source_folder
  }

  /// Retrieve the archive at `url` and extract it under `destination`.
  pub fn get(&mut self, url: &str, destination: impl Into<PathBuf>) -> &mut Self {
    self.specs.push(SourceFetchSpec::new(url, destination));
    self
  }

  /// Record a fully specified fetch.
  pub fn fetch(&mut self, spec: SourceFetchSpec) -> &mut Self {
    self.specs.push(spec);
    self
  }

  /// Close the hook window, validating every recorded fetch.
  pub fn finish(self) -> Result<Vec<SourceFetchSpec>, ConfigError> {
    let errors: Vec<ConfigError> = self.specs.iter().filter_map(|s| s.validate().err()).collect();
    match ConfigError::from_list(errors) {
      Some(err) => Err(err),
      None => Ok(self.specs),
    }
  }
}
