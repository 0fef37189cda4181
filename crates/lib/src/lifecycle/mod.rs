//! The per-invocation state machine.
//!
//! One [`Invocation`] drives one recipe instance through
//! `Loaded -> RequirementsCollected -> SourceMaterialized -> Resolved -> Generated`.
//! Steps run strictly in that order and at most once each. A failing step
//! leaves the state where it was; configuration errors abort the invocation,
//! fetch, resolve and generator failures can be retried by calling the same
//! step again.

mod types;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

pub use types::{LifecycleError, LifecycleState, MaterializedSource, Step};

use crate::error::ConfigError;
use crate::fetch::{ArchiveFetcher, FetchError};
use crate::generate::{GeneratorContext, GeneratorRegistry, GeneratorReport, invoke_generators};
use crate::graph::{self, DependencyGraph};
use crate::index::PackageIndex;
use crate::platform::paths;
use crate::recipe::{
  Capabilities, HasRequirements, HasSource, Layout, Recipe, RecipeConfig, Requirement, Requirements, SourceCtx,
  SourceFetchSpec,
};
use crate::settings::{AxisVocabulary, SettingsMatrix};

/// Host inputs needed to load a recipe.
#[derive(Debug, Clone, Copy)]
pub struct LoadContext<'a> {
  pub vocabulary: &'a AxisVocabulary,
  /// Everything the host binds; restricted to the recipe's axes at load.
  pub bindings: &'a SettingsMatrix,
  pub generators: &'a GeneratorRegistry,
  /// Directory the recipe lives in.
  pub root: &'a Path,
  /// Host output folder, used by the default layout.
  pub output_folder: &'a Path,
}

pub struct Invocation {
  recipe: Arc<dyn Recipe>,
  capabilities: Capabilities,
  settings: SettingsMatrix,
  layout: Layout,
  state: LifecycleState,
  halted_at: Option<Step>,
  aborted: bool,
  requirements: Vec<Requirement>,
  sources_recorded: bool,
  pending: Vec<SourceFetchSpec>,
  materialized: Vec<MaterializedSource>,
  graph: Option<DependencyGraph>,
  generated: Vec<GeneratorReport>,
}

impl Invocation {
  /// Validate the recipe's declarations against the host and apply its
  /// layout.
  ///
  /// Unknown axes, unbound axes, unknown generators and a malformed identity
  /// are all reported together, before any hook runs.
  pub fn load(recipe: Arc<dyn Recipe>, ctx: LoadContext<'_>) -> Result<Self, LifecycleError> {
    let config = recipe.config();
    let name = config.name().to_string();
    let declared = config.declared_settings();

    let mut errors = Vec::new();
    errors.extend(config.validate_identity().err());
    let axes = ctx.vocabulary.validate(&name, declared);
    let axes_known = axes.is_ok();
    errors.extend(axes.err());
    errors.extend(ctx.generators.validate(&name, config.declared_generators()).err());

    let settings = if axes_known {
      match ctx.bindings.restrict_to(&name, declared) {
        Ok(settings) => Some(settings),
        Err(err) => {
          errors.push(err);
          None
        }
      }
    } else {
      None
    };

    let settings = match (ConfigError::from_list(errors), settings) {
      (Some(source), _) => {
        return Err(LifecycleError::Configuration {
          step: Step::Load,
          source,
        });
      }
      (None, Some(settings)) => settings,
      (None, None) => SettingsMatrix::new(),
    };

    let capabilities = Capabilities::of(recipe.as_ref());
    let mut layout = Layout::host_default(ctx.root, ctx.output_folder, settings.get("build_type"));
    if let Some(hook) = capabilities.layout.then(|| recipe.as_layout()).flatten() {
      hook.layout(&mut layout);
      debug!(recipe = %name, layout = ?layout, "layout hook applied");
    }

    info!(recipe = %config.reference(), capabilities = %capabilities, "recipe loaded");
    Ok(Self {
      recipe,
      capabilities,
      settings,
      layout,
      state: LifecycleState::Loaded,
      halted_at: None,
      aborted: false,
      requirements: Vec::new(),
      sources_recorded: false,
      pending: Vec::new(),
      materialized: Vec::new(),
      graph: None,
      generated: Vec::new(),
    })
  }

  /// Run the `requirements` hook.
  pub fn collect_requirements(&mut self) -> Result<&[Requirement], LifecycleError> {
    self.enter(Step::Requirements)?;

    if let Some(hook) = self.requirements_hook() {
      let mut reqs = Requirements::new(self.settings.clone());
      hook.requirements(&mut reqs);
      match reqs.finish() {
        Ok(entries) => self.requirements = entries,
        Err(source) => return Err(self.abort(Step::Requirements, source)),
      }
    }

    debug!(recipe = %self.config().name(), count = self.requirements.len(), "requirements collected");
    self.advance(LifecycleState::RequirementsCollected);
    Ok(&self.requirements)
  }

  /// Run the `source` hook once, then fetch every recorded archive.
  ///
  /// Fetches that completed are not repeated when the step is retried.
  pub async fn materialize_source(&mut self, fetcher: &dyn ArchiveFetcher) -> Result<&[MaterializedSource], LifecycleError> {
    self.enter(Step::Source)?;
    self.record_sources()?;

    while let Some(spec) = self.pending.first().cloned() {
      let destination = spec.resolve(&self.layout.source_folder);
      if destination == paths::normalize(self.layout.root()) {
        let source = ConfigError::InvalidDestination {
          destination: spec.destination.display().to_string(),
          reason: "resolves to the recipe root".to_string(),
        };
        return Err(self.abort(Step::Source, source));
      }
      match fetcher.get(&spec, &destination).await {
        Ok(outcome) => {
          self.pending.remove(0);
          self.materialized.push(MaterializedSource {
            spec,
            destination,
            outcome,
          });
        }
        Err(FetchError::Config(source)) => return Err(self.abort(Step::Source, source)),
        Err(source) => {
          warn!(url = %spec.url, error = %source, "fetch failed");
          self.halted_at = Some(Step::Source);
          return Err(LifecycleError::Fetch { url: spec.url, source });
        }
      }
    }

    self.advance(LifecycleState::SourceMaterialized);
    Ok(&self.materialized)
  }

  fn record_sources(&mut self) -> Result<(), LifecycleError> {
    if self.sources_recorded {
      return Ok(());
    }
    if let Some(hook) = self.source_hook() {
      let mut ctx = SourceCtx::new(self.settings.clone(), self.layout.source_folder.clone());
      hook.source(&mut ctx);
      match ctx.finish() {
        Ok(specs) => self.pending = specs,
        Err(source) => return Err(self.abort(Step::Source, source)),
      }
    } else {
      debug!(recipe = %self.config().name(), "no source hook");
    }
    self.sources_recorded = true;
    Ok(())
  }

  /// Resolve the collected requirements against `index`.
  pub fn resolve(&mut self, index: &dyn PackageIndex) -> Result<&DependencyGraph, LifecycleError> {
    self.enter(Step::Resolve)?;
    match graph::resolve(self.config().name(), &self.requirements, index) {
      Ok(resolved) => {
        self.advance(LifecycleState::Resolved);
        Ok(self.graph.insert(resolved))
      }
      Err(err) => {
        self.halted_at = Some(Step::Resolve);
        Err(err.into())
      }
    }
  }

  /// Invoke every declared generator into the layout's generators folder.
  pub fn generate(&mut self, registry: &GeneratorRegistry) -> Result<&[GeneratorReport], LifecycleError> {
    self.enter(Step::Generate)?;
    let empty = DependencyGraph::empty();
    let ctx = GeneratorContext {
      recipe: self.recipe.config(),
      settings: &self.settings,
      graph: self.graph.as_ref().unwrap_or(&empty),
      output_dir: &self.layout.generators_folder,
    };
    match invoke_generators(registry, self.recipe.config().declared_generators(), &ctx) {
      Ok(reports) => {
        self.generated = reports;
        self.advance(LifecycleState::Generated);
        Ok(&self.generated)
      }
      Err(failures) => {
        self.halted_at = Some(Step::Generate);
        Err(failures.into())
      }
    }
  }

  /// Hooks are looked up only for capabilities recorded at load.
  fn requirements_hook(&self) -> Option<&dyn HasRequirements> {
    self.capabilities.requirements.then(|| self.recipe.as_requirements()).flatten()
  }

  fn source_hook(&self) -> Option<&dyn HasSource> {
    self.capabilities.source.then(|| self.recipe.as_source()).flatten()
  }

  fn enter(&self, step: Step) -> Result<(), LifecycleError> {
    if self.aborted {
      return Err(LifecycleError::Aborted {
        step: self.halted_at.unwrap_or(step),
      });
    }
    if self.state.next_step() != Some(step) {
      return Err(LifecycleError::OutOfOrder {
        requested: step,
        state: self.state,
      });
    }
    Ok(())
  }

  fn advance(&mut self, state: LifecycleState) {
    debug!(recipe = %self.config().name(), from = %self.state, to = %state, "lifecycle transition");
    self.state = state;
    self.halted_at = None;
  }

  fn abort(&mut self, step: Step, source: ConfigError) -> LifecycleError {
    warn!(recipe = %self.config().name(), step = %step, error = %source, "invocation aborted");
    self.aborted = true;
    self.halted_at = Some(step);
    LifecycleError::Configuration { step, source }
  }

  pub fn recipe(&self) -> &Arc<dyn Recipe> {
    &self.recipe
  }

  pub fn config(&self) -> &RecipeConfig {
    self.recipe.config()
  }

  pub fn capabilities(&self) -> Capabilities {
    self.capabilities
  }

  /// Bound settings, restricted to the recipe's declared axes.
  pub fn settings(&self) -> &SettingsMatrix {
    &self.settings
  }

  pub fn layout(&self) -> &Layout {
    &self.layout
  }

  pub fn state(&self) -> LifecycleState {
    self.state
  }

  /// The step that failed most recently, until a step succeeds.
  pub fn halted_at(&self) -> Option<Step> {
    self.halted_at
  }

  pub fn is_aborted(&self) -> bool {
    self.aborted
  }

  pub fn requirements(&self) -> &[Requirement] {
    &self.requirements
  }

  /// Fetches recorded by the `source` hook that have not completed yet.
  pub fn pending_sources(&self) -> &[SourceFetchSpec] {
    &self.pending
  }

  pub fn materialized(&self) -> &[MaterializedSource] {
    &self.materialized
  }

  pub fn graph(&self) -> Option<&DependencyGraph> {
    self.graph.as_ref()
  }

  pub fn generated(&self) -> &[GeneratorReport] {
    &self.generated
  }
}

impl std::fmt::Debug for Invocation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Invocation")
      .field("recipe", &self.config().reference())
      .field("state", &self.state)
      .field("halted_at", &self.halted_at)
      .field("aborted", &self.aborted)
      .finish_non_exhaustive()
  }
}
