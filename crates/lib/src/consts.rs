/// Application name used for config/cache/data directories.
pub const APP_NAME: &str = "recipekit";

/// Environment variable overriding the configuration directory.
pub const HOME_ENV: &str = "RECIPEKIT_HOME";

/// Completion marker written inside every materialized source destination.
pub const SOURCE_MARKER: &str = ".recipekit-source";

/// Prefix of staging directories created next to a fetch destination.
pub const STAGING_PREFIX: &str = ".recipekit-staging-";

/// Prefix used when moving a previous destination aside during a swap.
pub const BACKUP_PREFIX: &str = ".recipekit-previous-";

/// File name of the default profile inside `<config_dir>/profiles`.
pub const DEFAULT_PROFILE: &str = "default.toml";
