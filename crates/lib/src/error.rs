//! Configuration errors.
//!
//! Everything in this enum is detected before any network or filesystem
//! mutation happens, and aborts the whole invocation.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  /// A recipe declared a settings axis outside the host vocabulary.
  #[error("recipe '{recipe}' declares unknown settings axis '{axis}'")]
  UnknownAxis { recipe: String, axis: String },

  /// A declared axis has no value bound by the host.
  #[error("settings axis '{axis}' declared by recipe '{recipe}' has no value in the active profile")]
  UnboundAxis { recipe: String, axis: String },

  /// A recipe declared a generator the host registry does not know.
  #[error("recipe '{recipe}' declares unknown generator '{generator}'")]
  UnknownGenerator { recipe: String, generator: String },

  /// Recipe name or version is empty or malformed.
  #[error("invalid recipe identity '{identity}': {reason}")]
  InvalidIdentity { identity: String, reason: String },

  /// A requirement reference could not be parsed.
  #[error("malformed requirement reference '{reference}': {reason}")]
  MalformedReference { reference: String, reason: String },

  /// A version constraint could not be parsed.
  #[error("invalid version constraint '{constraint}' for '{reference}': {reason}")]
  InvalidConstraint {
    reference: String,
    constraint: String,
    reason: String,
  },

  /// A source URL is not a well-formed http(s) locator.
  #[error("invalid source url '{url}': {reason}")]
  InvalidSourceUrl { url: String, reason: String },

  /// A source destination escapes the source folder.
  #[error("invalid source destination '{destination}': {reason}")]
  InvalidDestination { destination: String, reason: String },

  /// A layout folder escapes the recipe root.
  #[error("invalid layout {field} '{folder}': must be a relative path inside the recipe root")]
  InvalidLayoutFolder { field: &'static str, folder: String },

  /// A `axis=value` override could not be parsed.
  #[error("invalid setting override '{0}': expected axis=value")]
  InvalidOverride(String),

  /// A configuration file could not be read.
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// A configuration file could not be parsed.
  #[error("failed to parse {path}: {message}")]
  Parse { path: PathBuf, message: String },

  /// Several errors reported by one hook.
  #[error("{}", join_errors(.0))]
  Multiple(Vec<ConfigError>),
}

impl ConfigError {
  /// Collapse a list of errors into a single one.
  ///
  /// Returns `None` for an empty list.
  pub fn from_list(mut errors: Vec<ConfigError>) -> Option<Self> {
    match errors.len() {
      0 => None,
      1 => errors.pop(),
      _ => Some(ConfigError::Multiple(errors)),
    }
  }
}

fn join_errors(errors: &[ConfigError]) -> String {
  errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}
