//! Error types for the [`sync`](super) module.

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("no remote folder ID configured")]
    MissingFolderId,
    #[display("`{_0}` executable not found on PATH")]
    ExecutableNotFound(#[error(not(source))] String),
    /// The destination backend has no directory on the local filesystem.
    #[display("cannot sync into non-local backend `{_0}`")]
    UnsupportedDestination(#[error(not(source))] String),
    #[display("could not start folder sync")]
    Spawn,
    /// Sync process exited unsuccessfully. `None` when killed by a signal.
    #[display("folder sync exited with code {_0:?}")]
    Failed(#[error(not(source))] Option<i32>),
    /// Writing a synced file into the destination failed.
    Storage,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Storage)
    }
}
