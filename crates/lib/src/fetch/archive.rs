//! Archive format detection and extraction.
//!
//! Supports:
//! - `.zip`
//! - `.tar.gz` / `.tgz`
//! - `.tar`
//!
//! The whole archive is in memory, so every archive is read twice: a scan
//! pass that only touches the in-memory bytes (any failure there is a format
//! problem) and an unpack pass that writes to disk (any failure there is a
//! filesystem problem).

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
  Zip,
  TarGz,
  Tar,
}

impl std::fmt::Display for ArchiveFormat {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Zip => write!(f, "zip"),
      Self::TarGz => write!(f, "tar.gz"),
      Self::Tar => write!(f, "tar"),
    }
  }
}

#[derive(Debug, Error)]
pub enum ExtractError {
  #[error("{0}")]
  Format(String),

  #[error("{path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Identify the container from its leading bytes.
pub fn detect(bytes: &[u8]) -> Option<ArchiveFormat> {
  if bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(b"PK\x05\x06") {
    Some(ArchiveFormat::Zip)
  } else if bytes.starts_with(&[0x1f, 0x8b]) {
    Some(ArchiveFormat::TarGz)
  } else if bytes.len() >= 262 && &bytes[257..262] == b"ustar" {
    Some(ArchiveFormat::Tar)
  } else {
    None
  }
}

/// Extract `bytes` into the existing directory `dest`.
///
/// Returns the number of entries in the archive.
pub fn extract(bytes: &[u8], format: ArchiveFormat, dest: &Path) -> Result<usize, ExtractError> {
  let count = match format {
    ArchiveFormat::Zip => extract_zip(bytes, dest)?,
    ArchiveFormat::TarGz => {
      let count = scan_tar(GzDecoder::new(Cursor::new(bytes)))?;
      unpack_tar(GzDecoder::new(Cursor::new(bytes)), dest)?;
      count
    }
    ArchiveFormat::Tar => {
      let count = scan_tar(Cursor::new(bytes))?;
      unpack_tar(Cursor::new(bytes), dest)?;
      count
    }
  };
  debug!(format = %format, entries = count, dest = ?dest, "archive extracted");
  Ok(count)
}

/// The single top-level directory under `dir`.
///
/// Used for `strip_root`: fails unless `dir` holds exactly one entry and that
/// entry is a directory.
pub fn single_root(dir: &Path) -> Result<PathBuf, ExtractError> {
  let io_err = |source| ExtractError::Io {
    path: dir.to_path_buf(),
    source,
  };
  let entries: Vec<fs::DirEntry> = fs::read_dir(dir).map_err(io_err)?.collect::<Result<_, _>>().map_err(io_err)?;
  match entries.as_slice() {
    [only] if only.file_type().map(|t| t.is_dir()).unwrap_or(false) => Ok(only.path()),
    _ => Err(ExtractError::Format(format!(
      "strip_root requires a single top-level directory, archive has {} top-level entries",
      entries.len()
    ))),
  }
}

fn extract_zip(bytes: &[u8], dest: &Path) -> Result<usize, ExtractError> {
  let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::Format(e.to_string()))?;

  for i in 0..archive.len() {
    let entry = archive.by_index_raw(i).map_err(|e| ExtractError::Format(e.to_string()))?;
    if entry.enclosed_name().is_none() {
      return Err(ExtractError::Format(format!("entry '{}' escapes the destination", entry.name())));
    }
  }

  let count = archive.len();
  archive.extract(dest).map_err(|e| match e {
    ZipError::Io(source) => ExtractError::Io {
      path: dest.to_path_buf(),
      source,
    },
    other => ExtractError::Format(other.to_string()),
  })?;
  Ok(count)
}

fn scan_tar<R: Read>(reader: R) -> Result<usize, ExtractError> {
  let format_err = |e: std::io::Error| ExtractError::Format(e.to_string());
  let mut archive = Archive::new(reader);
  let mut count = 0;
  for entry in archive.entries().map_err(format_err)? {
    let mut entry = entry.map_err(format_err)?;
    let path = entry.path().map_err(format_err)?.into_owned();
    if path
      .components()
      .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
    {
      return Err(ExtractError::Format(format!(
        "entry '{}' escapes the destination",
        path.display()
      )));
    }
    // Drain the body so truncated or corrupt data shows up here.
    std::io::copy(&mut entry, &mut std::io::sink()).map_err(format_err)?;
    count += 1;
  }
  if count == 0 {
    return Err(ExtractError::Format("tar archive contains no entries".to_string()));
  }
  Ok(count)
}

fn unpack_tar<R: Read>(reader: R, dest: &Path) -> Result<(), ExtractError> {
  let mut archive = Archive::new(reader);
  archive.set_preserve_permissions(true);
  archive.unpack(dest).map_err(|source| ExtractError::Io {
    path: dest.to_path_buf(),
    source,
  })
}
