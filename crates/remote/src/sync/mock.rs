//! In-memory folder sync for testing.

use super::FolderSync;
use super::error::{ErrorKind, Result};
use async_trait::async_trait;
use bannr_storage::StorageBackend;
use exn::ResultExt;

/// Folder sync that "downloads" a fixed set of files into the destination.
#[derive(Default)]
pub struct MockSync {
    files: Vec<(String, Vec<u8>)>,
    fail: bool,
}

impl MockSync {
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        Self {
            files: files.into_iter().map(|(name, data)| (name.into(), data.into())).collect(),
            fail: false,
        }
    }

    /// A sync that always fails without writing anything.
    pub fn failing() -> Self {
        Self {
            files: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl FolderSync for MockSync {
    async fn sync_folder(&self, remote: &str, destination: &dyn StorageBackend) -> Result<()> {
        if remote.trim().is_empty() {
            exn::bail!(ErrorKind::MissingFolderId);
        }
        if self.fail {
            exn::bail!(ErrorKind::Failed(Some(1)));
        }
        for (name, data) in &self.files {
            destination.write(name, data).await.or_raise(|| ErrorKind::Storage)?;
        }
        Ok(())
    }
}
