//! Storage backend trait and implementations.
//!
//! A backend is a single flat directory of files (the import folder, the
//! export folder). Listing is non-recursive and yields regular files only.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::Result;
use crate::file::FileInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::collections::BTreeSet;
use std::path::Path;
use std::pin::Pin;

pub(crate) type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// Unified interface for a flat directory of files.
///
/// # Name Handling
/// Every name is a bare file name (a single path component) and must pass
/// [`validate_name`](crate::validate_name). Implementations enforce this.
///
/// # Examples
///
/// ```
/// use bannr_storage::{backend::StorageBackend, error::Result};
///
/// async fn size_of(backend: &dyn StorageBackend, name: &str) -> Result<u64> {
///     if backend.exists(name).await? {
///         Ok(backend.read(name).await?.len() as u64)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the backend, used for logging only.
    fn name(&self) -> &str;

    /// Directory on the local filesystem backing this store, if there is
    /// one. External tools (such as a folder sync executable) need a real
    /// directory to write into.
    fn local_root(&self) -> Option<&Path> {
        None
    }

    /// List all regular files directly inside the backend.
    ///
    /// Default implementation of this method is to collect all the results
    /// from [`list_stream()`](Self::list_stream) into a [`Vec`] before
    /// returning.
    async fn list(&self) -> Result<Vec<FileInfo>> {
        self.list_stream().try_collect().await
    }

    /// Names of every regular file directly inside the backend.
    async fn list_names(&self) -> Result<BTreeSet<String>> {
        self.list_stream().map_ok(|info| info.name).try_collect().await
    }

    /// Stream file metadata, yielding results incrementally.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// # use bannr_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut stream = backend.list_stream();
    /// while let Some(info) = stream.try_next().await? {
    ///     println!("{}: {} bytes", info.name, info.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream(&self) -> FileInfoStream<'_>;

    /// Check if a file exists.
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Write file contents, creating or overwriting the file.
    async fn write(&self, name: &str, data: &[u8]) -> Result<()>;

    /// Delete a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn delete(&self, name: &str) -> Result<()>;

    /// Rename a file within the same backend.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the source
    /// file does not exist.
    ///
    /// # Notes
    /// - If the destination already exists, it will be overwritten; callers
    ///   that must not clobber check [`exists()`](Self::exists) first.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use bannr_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// backend.rename("IMG_0001.png", "TEAM01.png").await?;
    /// # Ok(())
    /// # }
    /// ```
    async fn rename(&self, from: &str, to: &str) -> Result<()>;
}
