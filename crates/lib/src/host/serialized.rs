use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::fetch::{ArchiveFetcher, FetchError, FetchOutcome};
use crate::platform::paths;
use crate::recipe::SourceFetchSpec;

/// Wraps a fetcher so that at most one fetch per destination path is in
/// flight. Fetches into different destinations still run concurrently.
pub struct SerializedFetcher {
  inner: Arc<dyn ArchiveFetcher>,
  locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl SerializedFetcher {
  pub fn new(inner: Arc<dyn ArchiveFetcher>) -> Self {
    Self {
      inner,
      locks: Mutex::new(HashMap::new()),
    }
  }

  /// Lock shared by every spelling of `destination`. Entries no fetch holds
  /// any more are dropped on the way.
  fn lock_for(&self, destination: &Path) -> Arc<tokio::sync::Mutex<()>> {
    let key = paths::normalize(destination);
    let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
    locks.retain(|path, lock| *path == key || Arc::strong_count(lock) > 1);
    locks.entry(key).or_default().clone()
  }

  #[cfg(test)]
  fn tracked(&self) -> usize {
    self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
  }
}

#[async_trait]
impl ArchiveFetcher for SerializedFetcher {
  async fn get(&self, spec: &SourceFetchSpec, destination: &Path) -> Result<FetchOutcome, FetchError> {
    let lock = self.lock_for(destination);
    let _guard = lock.lock().await;
    debug!(destination = ?destination, "acquired destination lock");
    self.inner.get(spec, destination).await
  }
}
