//! Implementation of the `rk inspect` command.
//!
//! Loads a recipe and collects its requirements without fetching anything,
//! then prints what it declares.

use std::path::Path;

use anyhow::{Context, Result};

use recipekit_lib::host::Host;

use super::{load_recipe, render_settings, resolve_profile};
use crate::SettingsArgs;
use crate::output::{OutputFormat, print_info, print_item, print_json, print_stat};

pub fn cmd_inspect(recipe_path: &Path, settings: &SettingsArgs, format: OutputFormat) -> Result<()> {
  let (recipe, root) = load_recipe(recipe_path)?;
  let profile = resolve_profile(settings)?;
  let host = Host::builder().profile(&profile).build();

  let sources = recipe.file().sources.clone();
  let mut inv = host
    .load(recipe, &root)
    .with_context(|| format!("Failed to load recipe: {}", recipe_path.display()))?;
  inv.collect_requirements().context("Failed to collect requirements")?;

  let config = inv.config();
  let requirements: Vec<String> = inv.requirements().iter().map(ToString::to_string).collect();

  if format.is_json() {
    return print_json(&serde_json::json!({
      "name": config.name(),
      "version": config.version(),
      "settings": config.declared_settings(),
      "bound": inv.settings(),
      "generators": config.declared_generators(),
      "capabilities": inv.capabilities(),
      "requirements": requirements,
      "sources": sources,
      "layout": inv.layout(),
    }));
  }

  print_info(&config.reference());
  print_stat("Hooks", &inv.capabilities().to_string());
  print_stat("Settings", &render_settings(inv.settings()));
  print_stat("Generators", &config.declared_generators().join(", "));

  if !requirements.is_empty() {
    print_stat("Requirements", &requirements.len().to_string());
    for requirement in &requirements {
      print_item(requirement);
    }
  }

  if !sources.is_empty() {
    print_stat("Sources", &sources.len().to_string());
    for source in &sources {
      print_item(&format!("{} -> {}", source.url, source.destination.display()));
    }
  }

  let layout = inv.layout();
  print_stat("Source folder", &layout.source_folder.display().to_string());
  print_stat("Build folder", &layout.build_folder.display().to_string());
  print_stat("Generators folder", &layout.generators_folder.display().to_string());
  Ok(())
}
