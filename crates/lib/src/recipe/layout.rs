use std::path::{Path, PathBuf};

use serde::Serialize;

/// Folders used by one invocation.
///
/// Without a `layout` hook the host default applies: sources live in the
/// recipe root, build and generator output go to the host output folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layout {
  root: PathBuf,
  build_type: Option<String>,
  pub source_folder: PathBuf,
  pub build_folder: PathBuf,
  pub generators_folder: PathBuf,
}

impl Layout {
  pub fn host_default(root: &Path, output_folder: &Path, build_type: Option<&str>) -> Self {
    Self {
      root: root.to_path_buf(),
      build_type: build_type.map(str::to_string),
      source_folder: root.to_path_buf(),
      build_folder: output_folder.to_path_buf(),
      generators_folder: output_folder.to_path_buf(),
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Bound `build_type`, when the recipe declared that axis.
  pub fn build_type(&self) -> Option<&str> {
    self.build_type.as_deref()
  }

  /// Sources under `src_folder`, build output per build type.
  ///
  /// `root/src_folder`, `root/build/<Type>` and `root/build/<Type>/generators`;
  /// without a bound build type the build folder is just `root/build`.
  pub fn cmake_layout(&mut self, src_folder: impl AsRef<Path>) -> &mut Self {
    self.source_folder = self.root.join(src_folder);
    let mut build = self.root.join("build");
    if let Some(build_type) = &self.build_type {
      build = build.join(build_type);
    }
    self.generators_folder = build.join("generators");
    self.build_folder = build;
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn host_default_layout() {
    let layout = Layout::host_default(Path::new("/r"), Path::new("/r/out"), Some("Release"));
    assert_eq!(layout.source_folder, PathBuf::from("/r"));
    assert_eq!(layout.generators_folder, PathBuf::from("/r/out"));
  }

  #[test]
  fn cmake_layout_uses_build_type() {
    let mut layout = Layout::host_default(Path::new("/r"), Path::new("/r/out"), Some("Debug"));
    layout.cmake_layout("dependencies");
    assert_eq!(layout.source_folder, PathBuf::from("/r/dependencies"));
    assert_eq!(layout.build_folder, PathBuf::from("/r/build/Debug"));
    assert_eq!(layout.generators_folder, PathBuf::from("/r/build/Debug/generators"));
  }

  #[test]
  fn cmake_layout_without_build_type() {
    let mut layout = Layout::host_default(Path::new("/r"), Path::new("/r/out"), None);
    layout.cmake_layout("src");
    assert_eq!(layout.build_folder, PathBuf::from("/r/build"));
    assert_eq!(layout.generators_folder, PathBuf::from("/r/build/generators"));
  }
}
