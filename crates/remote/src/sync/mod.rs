//! Pulling new source files from a remote folder.

pub mod error;
mod gdown;
#[cfg(feature = "mock")]
mod mock;

use self::error::Result;
use async_trait::async_trait;
use bannr_storage::StorageBackend;
use std::sync::Arc;

pub use self::gdown::GdownSync;
#[cfg(feature = "mock")]
pub use self::mock::MockSync;

/// Mirrors a remote folder into a storage backend.
///
/// Best-effort: files already present in the destination may or may not be
/// refreshed. Callers only look at what the destination contains once the
/// sync has returned.
#[async_trait]
pub trait FolderSync: Send + Sync {
    async fn sync_folder(&self, remote: &str, destination: &dyn StorageBackend) -> Result<()>;
}

pub type SyncHandle = Arc<dyn FolderSync + Send + Sync>;
