//! Types for the per-invocation lifecycle.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::error::ConfigError;
use crate::fetch::{FetchError, FetchOutcome};
use crate::generate::GeneratorFailures;
use crate::graph::ResolveError;
use crate::recipe::SourceFetchSpec;

/// The last step an invocation completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum LifecycleState {
  Loaded,
  RequirementsCollected,
  SourceMaterialized,
  Resolved,
  Generated,
}

impl LifecycleState {
  /// The step that moves out of this state, if any.
  pub fn next_step(self) -> Option<Step> {
    match self {
      Self::Loaded => Some(Step::Requirements),
      Self::RequirementsCollected => Some(Step::Source),
      Self::SourceMaterialized => Some(Step::Resolve),
      Self::Resolved => Some(Step::Generate),
      Self::Generated => None,
    }
  }
}

impl fmt::Display for LifecycleState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Loaded => "Loaded",
      Self::RequirementsCollected => "RequirementsCollected",
      Self::SourceMaterialized => "SourceMaterialized",
      Self::Resolved => "Resolved",
      Self::Generated => "Generated",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
  Load,
  Requirements,
  Source,
  Resolve,
  Generate,
}

impl fmt::Display for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Load => "load",
      Self::Requirements => "requirements",
      Self::Source => "source",
      Self::Resolve => "resolve",
      Self::Generate => "generate",
    };
    f.write_str(name)
  }
}

/// A fetch that completed during the `source` step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedSource {
  pub spec: SourceFetchSpec,
  pub destination: PathBuf,
  pub outcome: FetchOutcome,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
  /// Aborts the whole invocation.
  #[error("configuration error in {step}: {source}")]
  Configuration {
    step: Step,
    #[source]
    source: ConfigError,
  },

  #[error("source step failed for {url}: {source}")]
  Fetch {
    url: String,
    #[source]
    source: FetchError,
  },

  #[error("resolve step failed: {0}")]
  Resolve(#[from] ResolveError),

  #[error("generate step failed: {0}")]
  Generator(#[from] GeneratorFailures),

  #[error("cannot run {requested} while the invocation is {state}")]
  OutOfOrder { requested: Step, state: LifecycleState },

  #[error("invocation was aborted by a configuration error in {step}")]
  Aborted { step: Step },
}

impl LifecycleError {
  /// The step that failed; `None` for a refused call.
  pub fn step(&self) -> Option<Step> {
    match self {
      Self::Configuration { step, .. } => Some(*step),
      Self::Fetch { .. } => Some(Step::Source),
      Self::Resolve(_) => Some(Step::Resolve),
      Self::Generator(_) => Some(Step::Generate),
      Self::OutOfOrder { .. } | Self::Aborted { .. } => None,
    }
  }

  /// Taxonomy name used in reports.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Configuration { .. } => "ConfigurationError",
      Self::Fetch { source, .. } => source.kind(),
      Self::Resolve(_) => "ResolveError",
      Self::Generator(_) => "GeneratorError",
      Self::OutOfOrder { .. } | Self::Aborted { .. } => "LifecycleError",
    }
  }

  /// Whether re-running the failed step may succeed.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::Fetch { .. } | Self::Resolve(_) | Self::Generator(_))
  }
}
