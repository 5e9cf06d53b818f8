//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies a pipeline failure.
///
/// ### Aborting the whole operation
/// - [`ErrorKind::Configuration`], [`ErrorKind::Sync`], [`ErrorKind::Storage`]
///   raised before any file is touched.
/// - [`ErrorKind::Read`] from maintenance flows (a new-file run degrades it to
///   an empty ledger instead).
/// - [`ErrorKind::Write`] when the ledger cannot be updated.
/// - [`ErrorKind::Conflict`] when a batch rename would collide; no file is
///   touched.
///
/// ### Per file
/// - [`ErrorKind::Rename`] and [`ErrorKind::Upload`] are recorded against a
///   single file and never stop a batch.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not read ledger")]
    Read,
    #[display("could not write ledger")]
    Write,
    #[display("name conflict: {_0}")]
    Conflict(#[error(not(source))] String),
    #[display("could not rename file")]
    Rename,
    #[display("could not upload file")]
    Upload,
    #[display("configuration error: {_0}")]
    Configuration(#[error(not(source))] String),
    #[display("remote folder sync failed")]
    Sync,
    #[display("storage operation failed")]
    Storage,
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upload | Self::Sync)
    }
}
