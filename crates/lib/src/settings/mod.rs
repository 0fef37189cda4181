//! Settings axes and their bound values.
//!
//! A recipe only names the axes it is sensitive to; the host owns the
//! vocabulary of valid axis names and binds a concrete value to each of them
//! before any hook runs. The engine never interprets the values.

mod profile;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub use profile::{HostSection, Profile};

/// Axis names every host understands.
pub const DEFAULT_AXES: &[&str] = &[
  "os",
  "arch",
  "compiler",
  "compiler.version",
  "compiler.libcxx",
  "compiler.cppstd",
  "build_type",
];

/// The set of axis names a host accepts in recipe declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisVocabulary {
  axes: BTreeSet<String>,
}

impl Default for AxisVocabulary {
  fn default() -> Self {
    Self {
      axes: DEFAULT_AXES.iter().map(|s| s.to_string()).collect(),
    }
  }
}

impl AxisVocabulary {
  /// A vocabulary with no axes at all.
  pub fn empty() -> Self {
    Self { axes: BTreeSet::new() }
  }

  /// Add an axis name.
  pub fn with_axis(mut self, axis: impl Into<String>) -> Self {
    self.axes.insert(axis.into());
    self
  }

  /// Extend with several axis names.
  pub fn extend<I, S>(&mut self, axes: I)
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.axes.extend(axes.into_iter().map(Into::into));
  }

  pub fn contains(&self, axis: &str) -> bool {
    self.axes.contains(axis)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.axes.iter().map(String::as_str)
  }

  /// Check every declared axis against the vocabulary.
  ///
  /// All unknown axes are reported, in declaration order.
  pub fn validate(&self, recipe: &str, declared: &[String]) -> Result<(), ConfigError> {
    let errors = declared
      .iter()
      .filter(|axis| !self.contains(axis))
      .map(|axis| ConfigError::UnknownAxis {
        recipe: recipe.to_string(),
        axis: axis.clone(),
      })
      .collect();
    match ConfigError::from_list(errors) {
      Some(err) => Err(err),
      None => Ok(()),
    }
  }
}

/// Concrete values bound to settings axes.
///
/// Ordered by axis name so serialized output and generated files are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsMatrix {
  values: BTreeMap<String, String>,
}

impl SettingsMatrix {
  pub fn new() -> Self {
    Self::default()
  }

  /// Bind `axis` to `value`, replacing any previous binding.
  pub fn set(&mut self, axis: impl Into<String>, value: impl Into<String>) -> &mut Self {
    self.values.insert(axis.into(), value.into());
    self
  }

  /// Builder form of [`SettingsMatrix::set`].
  pub fn with(mut self, axis: impl Into<String>, value: impl Into<String>) -> Self {
    self.set(axis, value);
    self
  }

  pub fn get(&self, axis: &str) -> Option<&str> {
    self.values.get(axis).map(String::as_str)
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// Apply every binding of `other` on top of this matrix.
  pub fn merge(&mut self, other: &SettingsMatrix) {
    for (axis, value) in other.iter() {
      self.set(axis, value);
    }
  }

  /// Parse an `axis=value` override as given on the command line.
  pub fn apply_override(&mut self, spec: &str) -> Result<(), ConfigError> {
    let (axis, value) = spec
      .split_once('=')
      .map(|(a, v)| (a.trim(), v.trim()))
      .filter(|(a, v)| !a.is_empty() && !v.is_empty())
      .ok_or_else(|| ConfigError::InvalidOverride(spec.to_string()))?;
    self.set(axis, value);
    Ok(())
  }

  /// Restrict the matrix to the axes a recipe declared.
  ///
  /// Fails with `UnboundAxis` for every declared axis without a value.
  pub fn restrict_to(&self, recipe: &str, declared: &[String]) -> Result<SettingsMatrix, ConfigError> {
    let mut restricted = SettingsMatrix::new();
    let mut errors = Vec::new();
    for axis in declared {
      match self.get(axis) {
        Some(value) => {
          restricted.set(axis.clone(), value);
        }
        None => errors.push(ConfigError::UnboundAxis {
          recipe: recipe.to_string(),
          axis: axis.clone(),
        }),
      }
    }
    match ConfigError::from_list(errors) {
      Some(err) => Err(err),
      None => Ok(restricted),
    }
  }
}

impl<K, V> FromIterator<(K, V)> for SettingsMatrix
where
  K: Into<String>,
  V: Into<String>,
{
  fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
    let mut matrix = SettingsMatrix::new();
    for (k, v) in iter {
      matrix.set(k, v);
    }
    matrix
  }
}
