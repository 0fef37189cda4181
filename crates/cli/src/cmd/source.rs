//! Implementation of the `rk source` command.

use std::path::Path;

use anyhow::{Context, Result, bail};

use recipekit_lib::host::Host;

use super::{load_recipe, report_failure, resolve_profile};
use crate::SettingsArgs;
use crate::output::print_success;

/// Collect requirements and materialize sources, stopping before resolution.
pub fn cmd_source(recipe_path: &Path, settings: &SettingsArgs) -> Result<()> {
  let (recipe, root) = load_recipe(recipe_path)?;
  let profile = resolve_profile(settings)?;
  let host = Host::builder().profile(&profile).build();

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  match rt.block_on(host.source(recipe, &root)) {
    Ok(report) => {
      super::install::print_report(&report);
      println!();
      print_success(&format!("Sources ready for {}", report.recipe));
      Ok(())
    }
    Err(err) => {
      report_failure(&err);
      bail!("Source step failed")
    }
  }
}
