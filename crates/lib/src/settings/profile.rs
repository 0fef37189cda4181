//! Host profiles: settings bindings plus host options, stored as TOML.
//!
//! ```toml
//! [settings]
//! os = "Linux"
//! arch = "x86_64"
//! compiler = "gcc"
//! build_type = "Release"
//!
//! [host]
//! output_folder = "build"
//! parallelism = 4
//! vocabulary = ["flavor"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AxisVocabulary, SettingsMatrix};
use crate::consts::DEFAULT_PROFILE;
use crate::error::ConfigError;
use crate::platform::Platform;
use crate::platform::paths::profiles_dir;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
  #[serde(default)]
  pub settings: SettingsMatrix,
  #[serde(default, skip_serializing_if = "HostSection::is_empty")]
  pub host: HostSection,
}

/// Optional host options carried by a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostSection {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output_folder: Option<PathBuf>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parallelism: Option<usize>,
  /// Extra axis names accepted on top of the default vocabulary.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub vocabulary: Vec<String>,
}

impl HostSection {
  fn is_empty(&self) -> bool {
    self.output_folder.is_none() && self.parallelism.is_none() && self.vocabulary.is_empty()
  }
}

impl Profile {
  /// Build a profile from the running platform.
  ///
  /// Binds `os`, `arch`, `compiler` and `build_type`; axes that cannot be
  /// detected are left unbound.
  pub fn detect() -> Self {
    let mut settings = SettingsMatrix::new();
    if let Some(platform) = Platform::current() {
      platform.bind_defaults(&mut settings);
    }
    settings.set("build_type", "Release");
    debug!(settings = ?settings, "detected profile");
    Self {
      settings,
      host: HostSection::default(),
    }
  }

  /// Location of the default profile.
  pub fn default_path() -> PathBuf {
    profiles_dir().join(DEFAULT_PROFILE)
  }

  /// Load a profile from a TOML file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::parse(&content, path)
  }

  /// Parse profile TOML; `origin` is only used for error messages.
  pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse {
      path: origin.to_path_buf(),
      message: e.to_string(),
    })
  }

  /// Resolve the active profile.
  ///
  /// An explicit path must exist. Without one, the default profile is used
  /// when present, otherwise the detected profile. Detected values are always
  /// the base layer so a partial profile file only overrides what it names.
  pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
    let mut profile = Self::detect();
    let file = match explicit {
      Some(path) => Some(Self::load(path)?),
      None => {
        let default = Self::default_path();
        if default.is_file() {
          Some(Self::load(&default)?)
        } else {
          None
        }
      }
    };
    if let Some(file) = file {
      profile.settings.merge(&file.settings);
      profile.host = file.host;
    }
    Ok(profile)
  }

  /// Apply `axis=value` overrides on top of the profile settings.
  pub fn with_overrides<S: AsRef<str>>(mut self, overrides: &[S]) -> Result<Self, ConfigError> {
    for spec in overrides {
      self.settings.apply_override(spec.as_ref())?;
    }
    Ok(self)
  }

  /// Default vocabulary extended with the profile's extra axes.
  pub fn vocabulary(&self) -> AxisVocabulary {
    let mut vocabulary = AxisVocabulary::default();
    vocabulary.extend(self.host.vocabulary.iter().cloned());
    vocabulary
  }

  pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(self)
  }
}
