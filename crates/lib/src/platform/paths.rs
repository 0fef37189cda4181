use crate::consts::{APP_NAME, HOME_ENV};
use std::path::{Component, Path, PathBuf};

/// Returns the user's home directory
///
/// Falls back to the current directory when the variable is not set.
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var("USERPROFILE")
    .map(PathBuf::from)
    .unwrap_or_else(|_| PathBuf::from("."))
}

/// Returns the user's home directory
///
/// Falls back to the current directory when the variable is not set.
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var("HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| PathBuf::from("."))
}

/// Returns the directory for configuration files for the application
///
/// `RECIPEKIT_HOME` takes precedence over the platform location.
#[cfg(windows)]
pub fn config_dir() -> PathBuf {
  if let Ok(home) = std::env::var(HOME_ENV) {
    return PathBuf::from(home);
  }
  std::env::var("APPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join("AppData").join("Roaming"))
    .join(APP_NAME)
}

/// Returns the directory for configuration files for the application
///
/// `RECIPEKIT_HOME` takes precedence over the XDG location.
#[cfg(not(windows))]
pub fn config_dir() -> PathBuf {
  if let Ok(home) = std::env::var(HOME_ENV) {
    return PathBuf::from(home);
  }
  let config_home = std::env::var("XDG_CONFIG_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".config"));
  config_home.join(APP_NAME)
}

/// Returns the directory holding named profiles
pub fn profiles_dir() -> PathBuf {
  config_dir().join("profiles")
}

/// Lexically clean `path`: drop `.` components and fold `..` into the
/// preceding normal component. Never touches the filesystem.
///
/// A `..` that would climb above a root is dropped; a leading `..` on a
/// relative path is kept.
pub fn normalize(path: &Path) -> PathBuf {
  let path = dunce::simplified(path);
  let mut out: Vec<Component<'_>> = Vec::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => match out.last() {
        Some(Component::Normal(_)) => {
          out.pop();
        }
        Some(Component::RootDir | Component::Prefix(_)) => {}
        _ => out.push(component),
      },
      other => out.push(other),
    }
  }
  if out.is_empty() {
    return PathBuf::from(".");
  }
  out.iter().collect()
}

/// True when `path` is a non-empty relative path that stays below the folder
/// it is joined onto: no root, no drive prefix, no `..`.
pub fn is_contained(path: &Path) -> bool {
  !path.as_os_str().is_empty()
    && !path
      .components()
      .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
}
