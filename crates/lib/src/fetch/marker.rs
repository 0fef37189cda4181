//! The `.recipekit-source` completion record.
//!
//! Written into the staging tree right before it is swapped into place, so a
//! destination carrying a marker is always a complete extraction.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::SOURCE_MARKER;
use crate::recipe::SourceFetchSpec;
use crate::util::hash::{ContentHash, hash_tree};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMarker {
  pub url: String,
  /// sha256 of the downloaded archive bytes.
  pub archive_sha256: ContentHash,
  pub strip_root: bool,
  /// [`hash_tree`] of the destination, marker excluded.
  pub tree_sha256: ContentHash,
}

impl SourceMarker {
  pub fn read(dir: &Path) -> Option<Self> {
    let content = fs::read_to_string(dir.join(SOURCE_MARKER)).ok()?;
    serde_json::from_str(&content).ok()
  }

  pub fn write(&self, dir: &Path) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
    fs::write(dir.join(SOURCE_MARKER), json)
  }

  /// Whether this record describes `spec`. The checksum is only compared when
  /// the spec pins one.
  pub fn describes(&self, spec: &SourceFetchSpec) -> bool {
    self.url == spec.url
      && self.strip_root == spec.strip_root
      && spec.sha256.as_deref().is_none_or(|sha| self.archive_sha256.matches(sha))
  }
}

/// The marker of `destination` if it describes `spec` and the tree on disk is
/// still the one that was extracted.
pub fn current(destination: &Path, spec: &SourceFetchSpec) -> Option<SourceMarker> {
  let marker = SourceMarker::read(destination)?;
  if !marker.describes(spec) {
    debug!(destination = ?destination, "marker does not describe the requested fetch");
    return None;
  }
  match hash_tree(destination, &[SOURCE_MARKER]) {
    Ok(tree) if tree == marker.tree_sha256 => Some(marker),
    Ok(tree) => {
      debug!(destination = ?destination, expected = %marker.tree_sha256, actual = %tree, "materialized tree was modified");
      None
    }
    Err(_) => None,
  }
}
