//! In-memory storage backend for testing.

use super::FileInfoStream;
use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::file::FileInfo;
use crate::path::validate as validate_name;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use time::UtcDateTime;
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Files are stored in a map behind a [`RwLock`], so all trait methods can
/// operate on `&self` without external synchronisation. Renames into
/// specific names can be made to fail, to exercise recovery paths.
///
/// # Examples
///
/// ```
/// use bannr_storage::backend::{MockBackend, StorageBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([("IMG_0001.png", b"PNG")]);
/// assert!(backend.exists("IMG_0001.png").await?);
///
/// backend.write("TEAM1.png", b"PNG").await?;
/// assert!(backend.exists("TEAM1.png").await?);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<BTreeMap<String, (UtcDateTime, Vec<u8>)>>,
    failing_renames: RwLock<HashSet<String>>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any name fails validation. If test setup is wrong, then
    /// test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = BTreeMap::new();
        let now = UtcDateTime::now();
        for (name, data) in files {
            let name = name.into();
            if validate_name(&name).is_err() {
                panic!("MockBackend::with_files: invalid name {name:?}");
            }
            map.insert(name, (now, data.into()));
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            failing_renames: RwLock::new(HashSet::new()),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Make every rename whose destination is `name` fail with a
    /// [`BackendError`](ErrorKind::BackendError).
    pub fn with_failing_rename_to(mut self, name: impl Into<String>) -> Self {
        self.failing_renames.get_mut().insert(name.into());
        self
    }

    /// Runtime counterpart of [`with_failing_rename_to()`](Self::with_failing_rename_to),
    /// usable from inside async tests.
    pub async fn fail_renames_to(&self, name: impl Into<String>) {
        self.failing_renames.write().await.insert(name.into());
    }

    /// Sorted snapshot of the file names currently stored.
    pub async fn names(&self) -> Vec<String> {
        self.storage.read().await.keys().cloned().collect()
    }

    fn file_info(name: &str, size: u64, inserted: UtcDateTime) -> FileInfo {
        FileInfo::new(name, size, inserted)
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream(&self) -> FileInfoStream<'_> {
        Box::pin(stream! {
            // Snapshot under the read lock, then drop it before yielding to
            // avoid holding the lock across yield points.
            let entries: Vec<(String, UtcDateTime, u64)> = {
                let guard = self.storage.read().await;
                guard.iter().map(|(name, (inserted, data))| (name.clone(), *inserted, data.len() as u64)).collect()
            };
            for (name, inserted, size) in entries {
                yield Ok(Self::file_info(&name, size, inserted));
            }
        })
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let name = validate_name(name)?;
        Ok(self.storage.read().await.contains_key(name))
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let name = validate_name(name)?;
        let (_inserted, data) = self
            .storage
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(name.to_string())))?;
        Ok(data)
    }

    async fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let name = validate_name(name)?;
        self.storage.write().await.insert(name.to_string(), (UtcDateTime::now(), data.to_vec()));
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let name = validate_name(name)?;
        self.storage
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(name.to_string())))
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from = validate_name(from)?;
        let to = validate_name(to)?;
        if self.failing_renames.read().await.contains(to) {
            exn::bail!(ErrorKind::BackendError(format!("injected rename failure: {from} -> {to}")));
        }
        let mut guard = self.storage.write().await;
        let data = guard.remove(from).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(from.to_string())))?;
        guard.insert(to.to_string(), data);
        Ok(())
    }
}
