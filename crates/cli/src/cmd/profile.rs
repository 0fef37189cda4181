//! `rk profile show` and `rk profile detect`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use recipekit_lib::settings::Profile;

use crate::output::{print_info, print_success};

pub fn cmd_profile_show(path: Option<&Path>) -> Result<()> {
  let profile = Profile::resolve(path).context("Failed to resolve profile")?;
  let origin = match path {
    Some(path) => path.display().to_string(),
    None if Profile::default_path().is_file() => Profile::default_path().display().to_string(),
    None => "detected".to_string(),
  };
  print_info(&format!("Profile: {origin}"));
  println!();
  print!("{}", profile.to_toml().context("Failed to serialize profile")?);
  Ok(())
}

/// Write the detected profile to the default profile path.
pub fn cmd_profile_detect(force: bool) -> Result<()> {
  let path = Profile::default_path();
  if path.exists() && !force {
    bail!("Profile already exists: {} (use --force to overwrite)", path.display());
  }

  let content = Profile::detect().to_toml().context("Failed to serialize profile")?;
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).with_context(|| format!("Failed to create directory: {}", parent.display()))?;
  }
  fs::write(&path, &content).with_context(|| format!("Failed to write profile: {}", path.display()))?;

  print!("{content}");
  print_success(&format!("Wrote {}", path.display()));
  Ok(())
}
