//! Implementation of the `rk install` command.
//!
//! Drives a `recipe.toml` through every lifecycle step: requirements, source,
//! resolve and generate.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::info;

use recipekit_lib::host::{Host, InstallReport};
use recipekit_lib::index::FileIndex;

use super::{failure_json, load_recipe, render_settings, report_failure, resolve_profile};
use crate::SettingsArgs;
use crate::output::{
  OutputFormat, format_duration, print_info, print_item, print_json, print_stat, print_success, print_warning,
  truncate_hash,
};

pub fn cmd_install(
  recipe_path: &Path,
  settings: &SettingsArgs,
  index: Option<&Path>,
  output: Option<PathBuf>,
  format: OutputFormat,
) -> Result<()> {
  let (recipe, root) = load_recipe(recipe_path)?;
  let profile = resolve_profile(settings)?;

  let mut builder = Host::builder().profile(&profile);
  if let Some(path) = index {
    let index = FileIndex::load(path).with_context(|| format!("Failed to load package index: {}", path.display()))?;
    info!(path = %path.display(), packages = index.records().count(), "package index loaded");
    builder = builder.index(Arc::new(index));
  } else if !recipe.file().recipe.requires.is_empty() {
    print_warning("No --index given; requirements will not resolve");
  }
  if let Some(folder) = output {
    builder = builder.output_folder(folder);
  }
  let host = builder.build();

  let started = Instant::now();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = rt.block_on(host.install(recipe, &root));

  match result {
    Ok(report) => {
      if format.is_json() {
        print_json(&report)?;
      } else {
        print_report(&report);
        println!();
        print_success(&format!(
          "Installed {} in {}",
          report.recipe,
          format_duration(started.elapsed())
        ));
      }
      Ok(())
    }
    Err(err) => {
      if format.is_json() {
        print_json(&failure_json(&err))?;
      } else {
        report_failure(&err);
      }
      bail!("Install failed")
    }
  }
}

pub(super) fn print_report(report: &InstallReport) {
  print_info(&format!("{} ({})", report.recipe, report.state));
  print_stat("Settings", &render_settings(&report.settings));
  print_stat("Hooks", &report.capabilities.to_string());

  if !report.requirements.is_empty() {
    print_stat("Requirements", &report.requirements.join(", "));
  }

  if !report.sources.is_empty() {
    print_stat("Sources", &report.sources.len().to_string());
    for source in &report.sources {
      let how = if source.cached { "cached" } else { "fetched" };
      print_item(&format!(
        "{} -> {} ({}, tree {})",
        source.url,
        source.destination.display(),
        how,
        truncate_hash(&source.tree_sha256.0)
      ));
    }
  }

  if !report.packages.is_empty() {
    print_stat("Packages", &report.packages.len().to_string());
    for package in &report.packages {
      let kind = if package.direct { "direct" } else { "transitive" };
      print_item(&format!("{}/{} ({})", package.name, package.version, kind));
    }
  }

  if !report.generated.is_empty() {
    print_stat("Generators folder", &report.layout.generators_folder.display().to_string());
    for file in report.generated_files() {
      print_item(&file.display().to_string());
    }
  }
}
