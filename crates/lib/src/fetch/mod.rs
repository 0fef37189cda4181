//! Source archive retrieval.
//!
//! [`ArchiveFetcher::get`] downloads an archive, verifies it, extracts it into
//! a staging directory next to the destination and swaps the staging tree into
//! place. On any failure the destination is either absent or exactly what it
//! was before the call.

pub mod archive;
mod marker;

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::consts::{BACKUP_PREFIX, STAGING_PREFIX};
use crate::error::ConfigError;
use crate::recipe::SourceFetchSpec;
use crate::util::hash::{ContentHash, hash_bytes, hash_tree};

pub use archive::ArchiveFormat;
pub use marker::SourceMarker;

use archive::ExtractError;

#[derive(Debug, Error)]
pub enum FetchError {
  #[error("network error fetching {url}: {message}")]
  Network { url: String, message: String },

  #[error("archive format error for {url}: {message}")]
  ArchiveFormat { url: String, message: String },

  #[error("filesystem error at {path}: {source}")]
  Filesystem {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
  ChecksumMismatch { url: String, expected: String, actual: String },

  #[error(transparent)]
  Config(#[from] ConfigError),
}

impl FetchError {
  /// Taxonomy name used in reports.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Network { .. } => "NetworkError",
      Self::ArchiveFormat { .. } => "ArchiveFormatError",
      Self::Filesystem { .. } => "FilesystemError",
      Self::ChecksumMismatch { .. } => "ChecksumMismatch",
      Self::Config(_) => "ConfigurationError",
    }
  }

  fn filesystem(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
    move |source| Self::Filesystem {
      path: path.to_path_buf(),
      source,
    }
  }

  fn join(path: &Path) -> impl FnOnce(tokio::task::JoinError) -> Self + '_ {
    move |err| Self::Filesystem {
      path: path.to_path_buf(),
      source: std::io::Error::other(err),
    }
  }

  fn from_extract(url: &str, err: ExtractError) -> Self {
    match err {
      ExtractError::Format(message) => Self::ArchiveFormat {
        url: url.to_string(),
        message,
      },
      ExtractError::Io { path, source } => Self::Filesystem { path, source },
    }
  }
}

/// Result of a successful [`ArchiveFetcher::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
  /// The archive was downloaded and extracted.
  Fetched {
    bytes: usize,
    archive_sha256: ContentHash,
    tree_sha256: ContentHash,
  },
  /// The destination already held this exact extraction.
  Cached { tree_sha256: ContentHash },
}

impl FetchOutcome {
  pub fn tree_sha256(&self) -> &ContentHash {
    match self {
      Self::Fetched { tree_sha256, .. } | Self::Cached { tree_sha256 } => tree_sha256,
    }
  }

  pub fn is_cached(&self) -> bool {
    matches!(self, Self::Cached { .. })
  }
}

/// Retrieves the archive described by a [`SourceFetchSpec`] into an absolute
/// destination directory.
///
/// Implementations do not lock `destination`; callers that may race on the
/// same path serialize themselves.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
  async fn get(&self, spec: &SourceFetchSpec, destination: &Path) -> Result<FetchOutcome, FetchError>;
}

/// [`ArchiveFetcher`] over HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct HttpArchiveFetcher {
  client: reqwest::Client,
}

impl HttpArchiveFetcher {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_client(client: reqwest::Client) -> Self {
    Self { client }
  }

  async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
    let network = |message: String| FetchError::Network {
      url: url.to_string(),
      message,
    };

    let response = self.client.get(url).send().await.map_err(|e| network(e.to_string()))?;
    if !response.status().is_success() {
      return Err(network(format!("HTTP {}", response.status())));
    }
    let bytes = response.bytes().await.map_err(|e| network(e.to_string()))?;
    Ok(bytes.to_vec())
  }
}

#[async_trait]
impl ArchiveFetcher for HttpArchiveFetcher {
  async fn get(&self, spec: &SourceFetchSpec, destination: &Path) -> Result<FetchOutcome, FetchError> {
    spec.validate()?;
    info!(url = %spec.url, destination = ?destination, "fetching archive");

    if let Some(existing) = current_marker(spec, destination).await? {
      info!(destination = ?destination, "source already materialized");
      return Ok(FetchOutcome::Cached {
        tree_sha256: existing.tree_sha256,
      });
    }

    let bytes = self.download(&spec.url).await?;
    let archive_sha256 = hash_bytes(&bytes);
    if let Some(expected) = &spec.sha256
      && !archive_sha256.matches(expected)
    {
      return Err(FetchError::ChecksumMismatch {
        url: spec.url.clone(),
        expected: expected.clone(),
        actual: archive_sha256.0,
      });
    }

    let format = archive::detect(&bytes).ok_or_else(|| FetchError::ArchiveFormat {
      url: spec.url.clone(),
      message: "not a zip, tar.gz or tar archive".to_string(),
    })?;
    debug!(url = %spec.url, format = %format, size = bytes.len(), "archive downloaded");

    let size = bytes.len();
    let owned_spec = spec.clone();
    let owned_dest = destination.to_path_buf();
    let written = tokio::task::spawn_blocking(move || {
      materialize(&bytes, format, &owned_spec, archive_sha256, &owned_dest)
    })
    .await
    .map_err(FetchError::join(destination))??;

    info!(destination = ?destination, size = size, tree = %written.tree_sha256, "source materialized");
    Ok(FetchOutcome::Fetched {
      bytes: size,
      archive_sha256: written.archive_sha256,
      tree_sha256: written.tree_sha256,
    })
  }
}

/// [`marker::current`] on the blocking pool; it hashes the whole tree.
async fn current_marker(spec: &SourceFetchSpec, destination: &Path) -> Result<Option<SourceMarker>, FetchError> {
  let owned_spec = spec.clone();
  let owned_dest = destination.to_path_buf();
  tokio::task::spawn_blocking(move || marker::current(&owned_dest, &owned_spec))
    .await
    .map_err(FetchError::join(destination))
}

/// Extract into a staging directory beside `destination`, record the marker,
/// then swap the staged tree into place.
fn materialize(
  bytes: &[u8],
  format: ArchiveFormat,
  spec: &SourceFetchSpec,
  archive_sha256: ContentHash,
  destination: &Path,
) -> Result<SourceMarker, FetchError> {
  let parent = destination
    .parent()
    .filter(|p| !p.as_os_str().is_empty())
    .unwrap_or(Path::new("."));
  fs::create_dir_all(parent).map_err(FetchError::filesystem(parent))?;

  // Dropping the TempDir removes whatever was not moved out of it.
  let staging = tempfile::Builder::new()
    .prefix(STAGING_PREFIX)
    .tempdir_in(parent)
    .map_err(FetchError::filesystem(parent))?;
  let extracted = staging.path().join("tree");
  fs::create_dir(&extracted).map_err(FetchError::filesystem(&extracted))?;

  archive::extract(bytes, format, &extracted).map_err(|e| FetchError::from_extract(&spec.url, e))?;
  let tree = if spec.strip_root {
    archive::single_root(&extracted).map_err(|e| FetchError::from_extract(&spec.url, e))?
  } else {
    extracted
  };

  let record = SourceMarker {
    url: spec.url.clone(),
    archive_sha256,
    strip_root: spec.strip_root,
    tree_sha256: hash_tree(&tree, &[crate::consts::SOURCE_MARKER]).map_err(FetchError::filesystem(&tree))?,
  };
  record.write(&tree).map_err(FetchError::filesystem(&tree))?;

  swap_into_place(&tree, destination, parent)?;
  Ok(record)
}

fn swap_into_place(tree: &Path, destination: &Path, parent: &Path) -> Result<(), FetchError> {
  if fs::symlink_metadata(destination).is_err() {
    return fs::rename(tree, destination).map_err(FetchError::filesystem(destination));
  }

  let backup = tempfile::Builder::new()
    .prefix(BACKUP_PREFIX)
    .tempdir_in(parent)
    .map_err(FetchError::filesystem(parent))?;
  let aside = backup.path().join("previous");
  fs::rename(destination, &aside).map_err(FetchError::filesystem(destination))?;

  if let Err(source) = fs::rename(tree, destination) {
    if let Err(restore) = fs::rename(&aside, destination) {
      warn!(destination = ?destination, error = %restore, "failed to restore previous destination");
    }
    return Err(FetchError::Filesystem {
      path: destination.to_path_buf(),
      source,
    });
  }

  debug!(destination = ?destination, "replaced previous destination");
  Ok(())
}
