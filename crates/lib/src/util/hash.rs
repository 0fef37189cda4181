//! Content hashing for downloaded archives and materialized trees.
//!
//! - `hash_bytes()`: sha256 of an in-memory download
//! - `hash_tree()`: deterministic digest of an extracted directory tree

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

/// A full 64-character lowercase hex SHA256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl ContentHash {
  /// Case-insensitive comparison against a user supplied hex digest.
  pub fn matches(&self, expected: &str) -> bool {
    self.0.eq_ignore_ascii_case(expected.trim())
  }
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(hex::encode(hasher.finalize()))
}

/// Compute a deterministic digest of a directory tree.
///
/// Covers relative paths, file contents and symlink targets; timestamps and
/// permissions are ignored. Entries whose file name is in `exclude` are
/// skipped together with everything below them.
pub fn hash_tree(root: &Path, exclude: &[&str]) -> std::io::Result<ContentHash> {
  let mut lines: Vec<String> = Vec::new();

  let walker = WalkDir::new(root).sort_by_file_name().into_iter().filter_entry(|e| {
    e.file_name()
      .to_str()
      .map(|name| !exclude.contains(&name))
      .unwrap_or(true)
  });

  for entry in walker {
    let entry = entry.map_err(std::io::Error::other)?;
    let path = entry.path();
    let rel = path.strip_prefix(root).unwrap_or(path);
    if rel.as_os_str().is_empty() {
      continue;
    }
    // Forward slashes so the digest is identical across platforms.
    let rel = rel.to_string_lossy().replace('\\', "/");

    let file_type = entry.file_type();
    if file_type.is_file() {
      lines.push(format!("F:{}:{}", rel, hash_file(path)?));
    } else if file_type.is_dir() {
      lines.push(format!("D:{}", rel));
    } else if file_type.is_symlink() {
      let target = fs::read_link(path)?;
      lines.push(format!("L:{}:{}", rel, hash_bytes(target.to_string_lossy().as_bytes())));
    }
  }

  lines.sort();

  let mut hasher = Sha256::new();
  for line in lines {
    hasher.update(line.as_bytes());
    hasher.update(b"\n");
  }
  Ok(ContentHash(hex::encode(hasher.finalize())))
}

fn hash_file(path: &Path) -> std::io::Result<ContentHash> {
  let mut file = fs::File::open(path)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];
  loop {
    let n = file.read(&mut buffer)?;
    if n == 0 {
      break;
    }
    hasher.update(&buffer[..n]);
  }
  Ok(ContentHash(hex::encode(hasher.finalize())))
}
