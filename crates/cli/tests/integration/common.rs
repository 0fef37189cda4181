//! Shared test helpers for CLI integration tests.

use std::io::Write;
use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Zip archive holding `files` as `(path, content)` pairs.
pub fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
  let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
  let options = zip::write::SimpleFileOptions::default();
  for (path, content) in files {
    writer.start_file(*path, options).unwrap();
    writer.write_all(content.as_bytes()).unwrap();
  }
  writer.finish().unwrap().into_inner()
}

/// Isolated test environment.
///
/// Each test gets its own config home and recipe directory.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  /// Recipe directory (canonical, so it compares equal to what rk prints).
  pub fn recipe_dir(&self) -> PathBuf {
    let p = self.temp.path().join("compressor");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Config home for profiles (isolated per test).
  pub fn home_path(&self) -> PathBuf {
    let p = self.temp.path().join("home");
    std::fs::create_dir_all(&p).unwrap();
    p
  }

  /// Get a pre-configured Command running `rk <subcommand>`.
  ///
  /// `RECIPEKIT_HOME` points at an isolated, empty config home, and the
  /// platform axes are pinned so results do not depend on the test machine.
  pub fn rk_cmd(&self, subcommand: &str) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("rk");
    cmd.env("RECIPEKIT_HOME", self.home_path());
    cmd.env_remove("RUST_LOG");
    cmd.arg(subcommand);
    cmd.args(["-s", "os=Linux", "-s", "arch=x86_64", "-s", "compiler=gcc"]);
    cmd
  }
}
