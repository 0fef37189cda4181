mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

/// recipekit - fetch sources, resolve dependencies and generate build files
/// for package recipes
#[derive(Parser)]
#[command(name = "rk")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

/// Where settings come from: a profile file plus per-axis overrides.
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
  /// Profile file (default: <config_dir>/profiles/default.toml, else detected)
  #[arg(short, long)]
  pub profile: Option<PathBuf>,

  /// Override one settings axis, e.g. `-s build_type=Debug`
  #[arg(short = 's', long = "setting", value_name = "AXIS=VALUE")]
  pub settings: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run every lifecycle step for a recipe
  Install {
    /// Path to the recipe file
    #[arg(default_value = "recipe.toml")]
    recipe: PathBuf,

    #[command(flatten)]
    settings: SettingsArgs,

    /// Package index file used to resolve requirements
    #[arg(long)]
    index: Option<PathBuf>,

    /// Output folder, relative to the recipe directory unless absolute
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
  },

  /// Collect requirements and materialize sources only
  Source {
    /// Path to the recipe file
    #[arg(default_value = "recipe.toml")]
    recipe: PathBuf,

    #[command(flatten)]
    settings: SettingsArgs,
  },

  /// Show what a recipe declares without touching the network
  Inspect {
    /// Path to the recipe file
    #[arg(default_value = "recipe.toml")]
    recipe: PathBuf,

    #[command(flatten)]
    settings: SettingsArgs,

    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
  },

  /// Show or create the settings profile
  Profile {
    #[command(subcommand)]
    command: ProfileCommand,
  },

  /// Display platform and configuration information
  Info,
}

#[derive(Subcommand)]
enum ProfileCommand {
  /// Print the active profile
  Show {
    /// Profile file to show instead of the default
    #[arg(short, long)]
    profile: Option<PathBuf>,
  },

  /// Write the detected profile as the default profile
  Detect {
    /// Overwrite an existing default profile
    #[arg(long)]
    force: bool,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Install {
      recipe,
      settings,
      index,
      output,
      format,
    } => cmd::cmd_install(&recipe, &settings, index.as_deref(), output, format),
    Commands::Source { recipe, settings } => cmd::cmd_source(&recipe, &settings),
    Commands::Inspect {
      recipe,
      settings,
      format,
    } => cmd::cmd_inspect(&recipe, &settings, format),
    Commands::Profile { command } => match command {
      ProfileCommand::Show { profile } => cmd::cmd_profile_show(profile.as_deref()),
      ProfileCommand::Detect { force } => cmd::cmd_profile_detect(force),
    },
    Commands::Info => {
      cmd::cmd_info();
      Ok(())
    }
  }
}
