//! The host runtime.
//!
//! A [`Host`] owns everything an invocation needs from the outside world:
//! the settings vocabulary and bindings, the generator registry, the package
//! index, the archive fetcher and a few options. It drives one recipe through
//! the lifecycle with [`Host::install`], or many independent recipes at once
//! with [`Host::install_all`].
//!
//! A failed run hands its [`Invocation`] back inside [`HostError::Lifecycle`]
//! so the caller can inspect what was collected and continue with
//! [`Host::resume`] once the cause is fixed.

mod report;
mod serialized;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{error, info};

pub use report::{InstallReport, PackageSummary, SourceReport};
pub use serialized::SerializedFetcher;

use crate::fetch::{ArchiveFetcher, HttpArchiveFetcher};
use crate::generate::GeneratorRegistry;
use crate::index::{MemoryIndex, PackageIndex};
use crate::lifecycle::{Invocation, LifecycleError, LifecycleState, LoadContext};
use crate::recipe::Recipe;
use crate::settings::{AxisVocabulary, Profile, SettingsMatrix};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostOptions {
  /// Output folder of the default layout; relative paths are taken from the
  /// recipe root.
  pub output_folder: PathBuf,
  /// Maximum number of concurrent invocations in [`Host::install_all`].
  pub parallelism: usize,
}

impl Default for HostOptions {
  fn default() -> Self {
    Self {
      output_folder: PathBuf::from("build"),
      parallelism: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
    }
  }
}

#[derive(Debug, Error)]
pub enum HostError {
  #[error("{recipe}: {source}")]
  Lifecycle {
    recipe: String,
    /// `None` when the recipe failed to load.
    state: Option<LifecycleState>,
    /// The halted invocation, kept for inspection and retry. `None` when the
    /// recipe failed to load.
    invocation: Option<Box<Invocation>>,
    #[source]
    source: LifecycleError,
  },

  #[error("{recipe}: install task panicked: {message}")]
  Panicked { recipe: String, message: String },
}

impl HostError {
  pub fn lifecycle(&self) -> Option<&LifecycleError> {
    match self {
      Self::Lifecycle { source, .. } => Some(source),
      Self::Panicked { .. } => None,
    }
  }

  pub fn invocation(&self) -> Option<&Invocation> {
    match self {
      Self::Lifecycle { invocation, .. } => invocation.as_deref(),
      Self::Panicked { .. } => None,
    }
  }

  pub fn into_invocation(self) -> Option<Invocation> {
    match self {
      Self::Lifecycle { invocation, .. } => invocation.map(|inv| *inv),
      Self::Panicked { .. } => None,
    }
  }
}

/// One recipe to install from `root`.
pub struct InstallJob {
  pub recipe: Arc<dyn Recipe>,
  pub root: PathBuf,
}

struct HostInner {
  vocabulary: AxisVocabulary,
  bindings: SettingsMatrix,
  generators: GeneratorRegistry,
  index: Arc<dyn PackageIndex>,
  fetcher: SerializedFetcher,
  options: HostOptions,
}

/// Cheap to clone; clones share the same fetch locks.
#[derive(Clone)]
pub struct Host {
  inner: Arc<HostInner>,
}

pub struct HostBuilder {
  vocabulary: AxisVocabulary,
  bindings: SettingsMatrix,
  generators: GeneratorRegistry,
  index: Arc<dyn PackageIndex>,
  fetcher: Arc<dyn ArchiveFetcher>,
  options: HostOptions,
}

impl Default for HostBuilder {
  fn default() -> Self {
    Self {
      vocabulary: AxisVocabulary::default(),
      bindings: SettingsMatrix::new(),
      generators: GeneratorRegistry::with_builtins(),
      index: Arc::new(MemoryIndex::new()),
      fetcher: Arc::new(HttpArchiveFetcher::new()),
      options: HostOptions::default(),
    }
  }
}

impl HostBuilder {
  /// Take vocabulary, bindings and host options from a profile.
  pub fn profile(mut self, profile: &Profile) -> Self {
    self.vocabulary = profile.vocabulary();
    self.bindings = profile.settings.clone();
    if let Some(folder) = &profile.host.output_folder {
      self.options.output_folder = folder.clone();
    }
    if let Some(parallelism) = profile.host.parallelism {
      self.options.parallelism = parallelism;
    }
    self
  }

  pub fn vocabulary(mut self, vocabulary: AxisVocabulary) -> Self {
    self.vocabulary = vocabulary;
    self
  }

  pub fn bindings(mut self, bindings: SettingsMatrix) -> Self {
    self.bindings = bindings;
    self
  }

  pub fn generators(mut self, generators: GeneratorRegistry) -> Self {
    self.generators = generators;
    self
  }

  pub fn index(mut self, index: Arc<dyn PackageIndex>) -> Self {
    self.index = index;
    self
  }

  pub fn fetcher(mut self, fetcher: Arc<dyn ArchiveFetcher>) -> Self {
    self.fetcher = fetcher;
    self
  }

  pub fn output_folder(mut self, folder: impl Into<PathBuf>) -> Self {
    self.options.output_folder = folder.into();
    self
  }

  pub fn parallelism(mut self, parallelism: usize) -> Self {
    self.options.parallelism = parallelism;
    self
  }

  pub fn build(self) -> Host {
    Host {
      inner: Arc::new(HostInner {
        vocabulary: self.vocabulary,
        bindings: self.bindings,
        generators: self.generators,
        index: self.index,
        fetcher: SerializedFetcher::new(self.fetcher),
        options: self.options,
      }),
    }
  }
}

impl Host {
  pub fn builder() -> HostBuilder {
    HostBuilder::default()
  }

  pub fn bindings(&self) -> &SettingsMatrix {
    &self.inner.bindings
  }

  pub fn vocabulary(&self) -> &AxisVocabulary {
    &self.inner.vocabulary
  }

  pub fn generators(&self) -> &GeneratorRegistry {
    &self.inner.generators
  }

  pub fn options(&self) -> &HostOptions {
    &self.inner.options
  }

  /// Load a recipe without running any step.
  pub fn load(&self, recipe: Arc<dyn Recipe>, root: &Path) -> Result<Invocation, LifecycleError> {
    let output_folder = self.output_folder_for(root);
    Invocation::load(
      recipe,
      LoadContext {
        vocabulary: &self.inner.vocabulary,
        bindings: &self.inner.bindings,
        generators: &self.inner.generators,
        root,
        output_folder: &output_folder,
      },
    )
  }

  /// Drive `recipe` through every lifecycle step.
  pub async fn install(&self, recipe: Arc<dyn Recipe>, root: &Path) -> Result<InstallReport, HostError> {
    self.run(recipe, root, LifecycleState::Generated).await
  }

  /// Drive `recipe` up to `SourceMaterialized`.
  pub async fn source(&self, recipe: Arc<dyn Recipe>, root: &Path) -> Result<InstallReport, HostError> {
    self.run(recipe, root, LifecycleState::SourceMaterialized).await
  }

  /// Install independent recipes concurrently, at most `parallelism` at a
  /// time. Results come back in job order.
  pub async fn install_all(&self, jobs: Vec<InstallJob>) -> Vec<Result<InstallReport, HostError>> {
    let semaphore = Arc::new(Semaphore::new(self.inner.options.parallelism.max(1)));
    info!(jobs = jobs.len(), parallelism = self.inner.options.parallelism, "installing recipes");

    let mut handles = Vec::with_capacity(jobs.len());
    for job in jobs {
      let name = job.recipe.config().reference();
      let host = self.clone();
      let semaphore = semaphore.clone();
      let handle = tokio::spawn(async move {
        let _permit = semaphore.acquire().await;
        host.install(job.recipe, &job.root).await
      });
      handles.push((name, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
      let result = match handle.await {
        Ok(result) => result,
        Err(e) => {
          error!(recipe = %name, error = %e, "install task panicked");
          Err(HostError::Panicked {
            recipe: name,
            message: e.to_string(),
          })
        }
      };
      results.push(result);
    }
    results
  }

  /// Continue a halted invocation through every remaining step.
  ///
  /// Steps that already completed are skipped; an aborted invocation fails
  /// again with [`LifecycleError::Aborted`].
  pub async fn resume(&self, inv: Invocation) -> Result<InstallReport, HostError> {
    info!(recipe = %inv.config().reference(), state = %inv.state(), "resuming invocation");
    self.finish(inv, LifecycleState::Generated).await
  }

  async fn run(&self, recipe: Arc<dyn Recipe>, root: &Path, target: LifecycleState) -> Result<InstallReport, HostError> {
    let name = recipe.config().reference();
    let inv = self.load(recipe, root).map_err(|source| HostError::Lifecycle {
      recipe: name,
      state: None,
      invocation: None,
      source,
    })?;
    self.finish(inv, target).await
  }

  async fn finish(&self, mut inv: Invocation, target: LifecycleState) -> Result<InstallReport, HostError> {
    let name = inv.config().reference();
    match self.drive(&mut inv, target).await {
      Ok(()) => {
        info!(recipe = %name, state = %inv.state(), "invocation complete");
        Ok(InstallReport::from_invocation(&inv))
      }
      Err(source) => Err(HostError::Lifecycle {
        recipe: name,
        state: Some(inv.state()),
        invocation: Some(Box::new(inv)),
        source,
      }),
    }
  }

  async fn drive(&self, inv: &mut Invocation, target: LifecycleState) -> Result<(), LifecycleError> {
    if inv.state() < LifecycleState::RequirementsCollected {
      inv.collect_requirements()?;
    }
    if target >= LifecycleState::SourceMaterialized && inv.state() < LifecycleState::SourceMaterialized {
      inv.materialize_source(&self.inner.fetcher).await?;
    }
    if target >= LifecycleState::Resolved && inv.state() < LifecycleState::Resolved {
      inv.resolve(self.inner.index.as_ref())?;
    }
    if target >= LifecycleState::Generated && inv.state() < LifecycleState::Generated {
      inv.generate(&self.inner.generators)?;
    }
    Ok(())
  }

  fn output_folder_for(&self, root: &Path) -> PathBuf {
    let folder = &self.inner.options.output_folder;
    if folder.is_absolute() {
      folder.clone()
    } else {
      root.join(folder)
    }
  }
}

impl std::fmt::Debug for Host {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Host")
      .field("vocabulary", &self.inner.vocabulary)
      .field("bindings", &self.inner.bindings)
      .field("generators", &self.inner.generators)
      .field("options", &self.inner.options)
      .finish_non_exhaustive()
  }
}
