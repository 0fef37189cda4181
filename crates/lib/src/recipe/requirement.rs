//! The dependency declaration protocol.
//!
//! A recipe's `requirements` hook receives a [`Requirements`] context and
//! declares dependencies on it. Nothing here resolves or validates that a
//! package exists; malformed references are collected and reported once the
//! hook returns.

use std::cmp::Ordering;
use std::fmt;

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::error::ConfigError;
use crate::settings::SettingsMatrix;

/// A parsed `name[/version]` package reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
  pub name: String,
  /// Raw text after the slash: a version or a bracketed range.
  pub version: Option<String>,
}

impl PackageRef {
  /// Parse `name`, `name/version` or `name/[range]`.
  pub fn parse(reference: &str) -> Result<Self, String> {
    let reference = reference.trim();
    let (name, version) = match reference.split_once('/') {
      Some((name, version)) => (name, Some(version.trim())),
      None => (reference, None),
    };

    validate_name(name)?;

    if let Some(version) = version {
      if version.is_empty() {
        return Err("empty version after '/'".to_string());
      }
      if version.contains('/') {
        return Err("unexpected '/' in version".to_string());
      }
    }

    Ok(Self {
      name: name.to_string(),
      version: version.map(str::to_string),
    })
  }
}

fn validate_name(name: &str) -> Result<(), String> {
  let mut chars = name.chars();
  match chars.next() {
    None => return Err("package name is empty".to_string()),
    Some(c) if !(c.is_ascii_alphanumeric() || c == '_') => {
      return Err(format!("package name must start with a letter, digit or '_', found '{}'", c));
    }
    Some(_) => {}
  }
  if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-'))) {
    return Err(format!("invalid character '{}' in package name", bad));
  }
  Ok(())
}

/// A package version.
///
/// Versions with one or two numeric components are zero-padded to semver
/// (`1.2` compares as `1.2.0`). Versions that are not semver even after
/// padding sort below every semver version and compare among themselves as
/// plain strings.
#[derive(Debug, Clone)]
pub struct Version {
  raw: String,
  semver: Option<semver::Version>,
}

impl Version {
  pub fn parse(raw: &str) -> Self {
    let raw = raw.trim();
    Self {
      raw: raw.to_string(),
      semver: lenient_semver(raw),
    }
  }

  pub fn as_str(&self) -> &str {
    &self.raw
  }

  pub fn semver(&self) -> Option<&semver::Version> {
    self.semver.as_ref()
  }
}

fn lenient_semver(raw: &str) -> Option<semver::Version> {
  if let Ok(v) = semver::Version::parse(raw) {
    return Some(v);
  }
  let parts: Vec<&str> = raw.split('.').collect();
  if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
    return None;
  }
  let mut padded = parts.clone();
  padded.resize(3, "0");
  semver::Version::parse(&padded.join(".")).ok()
}

impl Ord for Version {
  fn cmp(&self, other: &Self) -> Ordering {
    match (&self.semver, &other.semver) {
      (Some(a), Some(b)) => a.cmp(b),
      (Some(_), None) => Ordering::Greater,
      (None, Some(_)) => Ordering::Less,
      (None, None) => self.raw.cmp(&other.raw),
    }
  }
}

impl PartialOrd for Version {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl PartialEq for Version {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for Version {}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.raw)
  }
}

impl Serialize for Version {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.raw)
  }
}

/// A version predicate attached to a requirement.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionConstraint {
  /// `*`: any version.
  Any,
  /// A bare version: only that version.
  Exact(Version),
  /// Comparators such as `>=1.2 <2`, evaluated as a semver requirement.
  Range { raw: String, req: semver::VersionReq },
}

impl VersionConstraint {
  /// Parse a constraint.
  ///
  /// Accepts `*`, a bare version, or comparators separated by spaces or
  /// commas, optionally wrapped in brackets (`[>=1.2 <2.0]`).
  pub fn parse(text: &str) -> Result<Self, String> {
    let trimmed = text.trim();
    let opens = trimmed.starts_with('[');
    let closes = trimmed.len() > usize::from(opens) && trimmed.ends_with(']');
    if opens != closes {
      return Err(format!("unbalanced brackets in '{}'", trimmed));
    }
    let inner = if opens {
      trimmed[1..trimmed.len() - 1].trim()
    } else {
      trimmed
    };

    if inner.is_empty() {
      let what = if opens { "range" } else { "constraint" };
      return Err(format!("empty version {}", what));
    }
    if inner.contains(['[', ']']) {
      return Err(format!("stray bracket in '{}'", trimmed));
    }
    if inner == "*" {
      return Ok(Self::Any);
    }

    let starts_with_operator = inner.starts_with(OPERATORS);
    if !opens && !starts_with_operator {
      if inner.contains(OPERATORS) || inner.contains(char::is_whitespace) || inner.contains(',') {
        return Err(format!("'{}' is neither a version nor a comparator list", inner));
      }
      return Ok(Self::Exact(Version::parse(inner)));
    }

    let joined = join_comparators(inner)?;
    let req = semver::VersionReq::parse(&joined).map_err(|e| e.to_string())?;
    Ok(Self::Range {
      raw: inner.to_string(),
      req,
    })
  }

  pub fn matches(&self, version: &Version) -> bool {
    match self {
      Self::Any => true,
      Self::Exact(expected) => expected == version,
      Self::Range { req, .. } => version.semver().map(|v| req.matches(v)).unwrap_or(false),
    }
  }
}

const OPERATORS: [char; 5] = ['<', '>', '=', '~', '^'];

/// Turn `>= 1.2 <2` into `>=1.2, <2`.
fn join_comparators(text: &str) -> Result<String, String> {
  let mut comparators: Vec<String> = Vec::new();
  let mut pending_op = String::new();
  for token in text.split(|c: char| c.is_whitespace() || c == ',').filter(|t| !t.is_empty()) {
    if token.chars().all(|c| OPERATORS.contains(&c)) {
      pending_op.push_str(token);
      continue;
    }
    comparators.push(format!("{}{}", std::mem::take(&mut pending_op), token));
  }
  if !pending_op.is_empty() {
    return Err(format!("operator '{}' has no version", pending_op));
  }
  Ok(comparators.join(", "))
}

impl fmt::Display for VersionConstraint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Any => write!(f, "*"),
      Self::Exact(v) => write!(f, "{}", v),
      Self::Range { raw, .. } => write!(f, "[{}]", raw),
    }
  }
}

impl Serialize for VersionConstraint {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

/// One declared dependency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Requirement {
  pub name: String,
  pub constraint: VersionConstraint,
}

impl Requirement {
  pub fn new(name: impl Into<String>, constraint: VersionConstraint) -> Self {
    Self {
      name: name.into(),
      constraint,
    }
  }

  /// Parse a `name`, `name/version` or `name/[range]` reference.
  pub fn parse(reference: &str) -> Result<Self, ConfigError> {
    let pkg = PackageRef::parse(reference).map_err(|reason| ConfigError::MalformedReference {
      reference: reference.to_string(),
      reason,
    })?;
    let constraint = match pkg.version.as_deref() {
      Some(text) => VersionConstraint::parse(text).map_err(|reason| ConfigError::InvalidConstraint {
        reference: reference.to_string(),
        constraint: text.to_string(),
        reason,
      })?,
      None => VersionConstraint::Any,
    };
    Ok(Self::new(pkg.name, constraint))
  }
}

impl fmt::Display for Requirement {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.constraint {
      VersionConstraint::Any => write!(f, "{}", self.name),
      constraint => write!(f, "{}/{}", self.name, constraint),
    }
  }
}

/// Context handed to the `requirements` hook.
#[derive(Debug)]
pub struct Requirements {
  settings: SettingsMatrix,
  entries: Vec<Requirement>,
  errors: Vec<ConfigError>,
}

impl Requirements {
  pub fn new(settings: SettingsMatrix) -> Self {
    Self {
      settings,
      entries: Vec::new(),
      errors: Vec::new(),
    }
  }

  /// Settings bound for this invocation, restricted to the declared axes.
  pub fn settings(&self) -> &SettingsMatrix {
    &self.settings
  }

  /// Declare `name`, `name/version` or `name/[range]`.
  pub fn requires(&mut self, reference: &str) -> &mut Self {
    match Requirement::parse(reference) {
      Ok(requirement) => self.insert(requirement),
      Err(err) => self.errors.push(err),
    }
    self
  }

  /// Declare `reference` with an optional separate constraint.
  ///
  /// A reference that already carries a version cannot take another
  /// constraint.
  pub fn add_requirement(&mut self, reference: &str, constraint: Option<&str>) -> &mut Self {
    let Some(constraint_text) = constraint else {
      return self.requires(reference);
    };
    match PackageRef::parse(reference) {
      Ok(pkg) if pkg.version.is_some() => self.errors.push(ConfigError::MalformedReference {
        reference: reference.to_string(),
        reason: "reference already carries a version; pass the constraint separately or not at all".to_string(),
      }),
      Ok(pkg) => match VersionConstraint::parse(constraint_text) {
        Ok(constraint) => self.insert(Requirement::new(pkg.name, constraint)),
        Err(reason) => self.errors.push(ConfigError::InvalidConstraint {
          reference: reference.to_string(),
          constraint: constraint_text.to_string(),
          reason,
        }),
      },
      Err(reason) => self.errors.push(ConfigError::MalformedReference {
        reference: reference.to_string(),
        reason,
      }),
    }
    self
  }

  fn insert(&mut self, requirement: Requirement) {
    if let Some(existing) = self.entries.iter_mut().find(|r| r.name == requirement.name) {
      debug!(package = %requirement.name, old = %existing.constraint, new = %requirement.constraint, "overriding requirement");
      existing.constraint = requirement.constraint;
    } else {
      debug!(package = %requirement.name, constraint = %requirement.constraint, "requirement declared");
      self.entries.push(requirement);
    }
  }

  /// Declared requirements in first-declaration order.
  pub fn entries(&self) -> &[Requirement] {
    &self.entries
  }

  pub fn get(&self, name: &str) -> Option<&Requirement> {
    self.entries.iter().find(|r| r.name == name)
  }

  /// Close the declaration window.
  pub fn finish(self) -> Result<Vec<Requirement>, ConfigError> {
    match ConfigError::from_list(self.errors) {
      Some(err) => Err(err),
      None => Ok(self.entries),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn reqs() -> Requirements {
    Requirements::new(SettingsMatrix::new())
  }

  #[test]
  fn parse_reference_forms() {
    let bare = PackageRef::parse("zlib").unwrap();
    assert_eq!(bare.name, "zlib");
    assert_eq!(bare.version, None);

    let versioned = PackageRef::parse("exprtk/0.0.2").unwrap();
    assert_eq!(versioned.name, "exprtk");
    assert_eq!(versioned.version.as_deref(), Some("0.0.2"));

    let ranged = PackageRef::parse("libfoo/[>=1.2 <2]").unwrap();
    assert_eq!(ranged.version.as_deref(), Some("[>=1.2 <2]"));
  }

  #[test]
  fn parse_reference_rejects_malformed() {
    assert!(PackageRef::parse("").is_err());
    assert!(PackageRef::parse("/1.0").is_err());
    assert!(PackageRef::parse("zlib/").is_err());
    assert!(PackageRef::parse("zlib/1.0/extra").is_err());
    assert!(PackageRef::parse("-zlib").is_err());
    assert!(PackageRef::parse("zl ib").is_err());
  }

  #[test]
  fn short_versions_are_padded() {
    assert_eq!(Version::parse("1.2"), Version::parse("1.2.0"));
    assert!(Version::parse("1.10") > Version::parse("1.9"));
    assert!(Version::parse("2").semver().is_some());
    assert!(Version::parse("2023.01.02.1").semver().is_none());
  }

  #[test]
  fn non_semver_versions_sort_below_semver() {
    assert!(Version::parse("nightly") < Version::parse("0.0.1"));
    assert!(Version::parse("a-build") < Version::parse("b-build"));
  }

  #[test]
  fn constraint_forms() {
    assert_eq!(VersionConstraint::parse("*").unwrap(), VersionConstraint::Any);
    assert!(matches!(VersionConstraint::parse("0.0.2").unwrap(), VersionConstraint::Exact(_)));
    assert!(matches!(VersionConstraint::parse(">=1.2").unwrap(), VersionConstraint::Range { .. }));
    assert!(matches!(VersionConstraint::parse("[>=1.2 <2.0]").unwrap(), VersionConstraint::Range { .. }));
    assert!(VersionConstraint::parse("").is_err());
    assert!(VersionConstraint::parse("[]").is_err());
    assert!(VersionConstraint::parse("1.0 2.0").is_err());
    assert!(VersionConstraint::parse(">=banana").is_err());
  }

  #[test]
  fn unbalanced_brackets_are_rejected() {
    for text in ["[>=1.2", "[", "1.2]", "]", "[ ]", "[>=1.2]]", "[[>=1.2]"] {
      assert!(VersionConstraint::parse(text).is_err(), "{text}");
    }
  }

  #[test]
  fn operators_need_a_version() {
    for text in [">", ">=", "[<]", ">=1.2 <"] {
      assert!(VersionConstraint::parse(text).is_err(), "{text}");
    }
  }

  #[test]
  fn exact_versions_reject_operator_characters() {
    for text in ["1.2>", "1.=2", "1~2", "1.2^", "1<2"] {
      assert!(VersionConstraint::parse(text).is_err(), "{text}");
    }
  }

  #[test]
  fn unclosed_range_fails_finish() {
    let mut r = reqs();
    r.requires("libfoo/[>=1.2");
    assert!(r.entries().is_empty());
    assert!(matches!(r.finish(), Err(ConfigError::InvalidConstraint { .. })));
  }

  #[test]
  fn range_matching() {
    let c = VersionConstraint::parse(">=1.2").unwrap();
    assert!(c.matches(&Version::parse("1.2")));
    assert!(c.matches(&Version::parse("3.0.1")));
    assert!(!c.matches(&Version::parse("1.1.9")));

    let bounded = VersionConstraint::parse("[>= 1.2 <2]").unwrap();
    assert!(bounded.matches(&Version::parse("1.9.9")));
    assert!(!bounded.matches(&Version::parse("2.0.0")));
    assert!(!bounded.matches(&Version::parse("weird")));
  }

  #[test]
  fn exact_matching_uses_padded_comparison() {
    let c = VersionConstraint::parse("0.0.2").unwrap();
    assert!(c.matches(&Version::parse("0.0.2")));
    assert!(!c.matches(&Version::parse("0.0.3")));

    let weird = VersionConstraint::parse("2023.01.02.1").unwrap();
    assert!(weird.matches(&Version::parse("2023.01.02.1")));
  }

  #[test]
  fn requirements_accumulate_in_order() {
    let mut r = reqs();
    r.requires("exprtk/0.0.2").add_requirement("libfoo", Some(">=1.2")).requires("zlib");
    let entries = r.finish().unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["exprtk", "libfoo", "zlib"]);
    assert_eq!(entries[2].constraint, VersionConstraint::Any);
  }

  #[test]
  fn duplicate_overwrites_in_place() {
    let mut r = reqs();
    r.requires("a/1.0").requires("b/1.0").requires("a/2.0");
    let entries = r.finish().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "a");
    assert_eq!(entries[0].to_string(), "a/2.0");
  }

  #[test]
  fn malformed_declarations_are_reported_on_finish() {
    let mut r = reqs();
    r.requires("ok/1.0")
      .requires("bad name/1.0")
      .add_requirement("libfoo", Some(">=nope"))
      .add_requirement("zlib/1.3", Some(">=1"));
    assert_eq!(r.entries().len(), 1);
    let err = r.finish().unwrap_err();
    match err {
      ConfigError::Multiple(errors) => {
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], ConfigError::MalformedReference { .. }));
        assert!(matches!(errors[1], ConfigError::InvalidConstraint { .. }));
        assert!(matches!(errors[2], ConfigError::MalformedReference { .. }));
      }
      other => panic!("expected multiple errors, got {other:?}"),
    }
  }

  #[test]
  fn hook_can_read_settings() {
    let r = Requirements::new(SettingsMatrix::new().with("os", "Windows"));
    assert_eq!(r.settings().get("os"), Some("Windows"));
  }

  #[test]
  fn requirement_display() {
    assert_eq!(Requirement::new("zlib", VersionConstraint::Any).to_string(), "zlib");
    let ranged = Requirement::new("foo", VersionConstraint::parse(">=1.2").unwrap());
    assert_eq!(ranged.to_string(), "foo/[>=1.2]");
  }
}
