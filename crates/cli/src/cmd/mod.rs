mod info;
mod inspect;
mod install;
mod profile;
mod source;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use recipekit_lib::host::HostError;
use recipekit_lib::lifecycle::{Invocation, LifecycleError};
use recipekit_lib::recipe::ManifestRecipe;
use recipekit_lib::settings::{Profile, SettingsMatrix};

use crate::SettingsArgs;
use owo_colors::Stream;

use crate::output::{print_error, print_stat_to, symbols};

pub use info::cmd_info;
pub use inspect::cmd_inspect;
pub use install::cmd_install;
pub use profile::{cmd_profile_detect, cmd_profile_show};
pub use source::cmd_source;

/// Load `recipe.toml` and return it with its (canonical) recipe root.
fn load_recipe(path: &Path) -> Result<(Arc<ManifestRecipe>, PathBuf)> {
  let recipe = ManifestRecipe::load(path).with_context(|| format!("Failed to load recipe: {}", path.display()))?;
  let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
  let root = dunce::canonicalize(parent).with_context(|| format!("Failed to resolve recipe directory: {}", parent.display()))?;
  Ok((Arc::new(recipe), root))
}

/// Profile named by `args` (or the default one) with the `-s` overrides applied.
fn resolve_profile(args: &SettingsArgs) -> Result<Profile> {
  let profile = Profile::resolve(args.profile.as_deref()).context("Failed to resolve profile")?;
  profile.with_overrides(args.settings.as_slice()).context("Invalid setting override")
}

fn render_settings(settings: &SettingsMatrix) -> String {
  if settings.is_empty() {
    return "(none)".to_string();
  }
  settings
    .iter()
    .map(|(axis, value)| format!("{axis}={value}"))
    .collect::<Vec<_>>()
    .join(", ")
}

/// Print which step failed, which generators failed and why.
fn report_failure(err: &HostError) {
  print_error(&err.to_string());
  let HostError::Lifecycle {
    state,
    invocation,
    source,
    ..
  } = err
  else {
    return;
  };
  if let Some(step) = source.step() {
    print_stat_to(Stream::Stderr, "Failed step", &step.to_string());
  }
  print_stat_to(Stream::Stderr, "Error kind", source.kind());
  if let Some(state) = state {
    print_stat_to(Stream::Stderr, "Reached state", &state.to_string());
  }
  if let Some(inv) = invocation.as_deref().filter(|inv| !inv.requirements().is_empty()) {
    print_stat_to(Stream::Stderr, "Requirements", &requirement_list(inv).join(", "));
  }
  if let LifecycleError::Generator(failures) = source {
    print_stat_to(Stream::Stderr, "Failed generators", &failures.failed_names().join(", "));
    for failure in &failures.failures {
      eprintln!("    {} {}: {}", symbols::ARROW, failure.generator, failure.error);
    }
  }
}

fn requirement_list(inv: &Invocation) -> Vec<String> {
  inv.requirements().iter().map(ToString::to_string).collect()
}

/// JSON shape of a failed invocation.
fn failure_json(err: &HostError) -> serde_json::Value {
  match err {
    HostError::Lifecycle {
      recipe,
      state,
      invocation,
      source,
    } => {
      let failed_generators = match source {
        LifecycleError::Generator(failures) => failures.failed_names(),
        _ => Vec::new(),
      };
      serde_json::json!({
        "recipe": recipe,
        "state": state,
        "step": source.step().map(|s| s.to_string()),
        "kind": source.kind(),
        "error": source.to_string(),
        "failed_generators": failed_generators,
        "requirements": invocation.as_deref().map(requirement_list),
      })
    }
    HostError::Panicked { recipe, message } => serde_json::json!({
      "recipe": recipe,
      "kind": "Panicked",
      "error": message,
    }),
  }
}
