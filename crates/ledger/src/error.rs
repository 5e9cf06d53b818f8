//! Ledger Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The ledger exists but could not be read or parsed.
    #[display("could not read ledger {}", _0.display())]
    Read(#[error(not(source))] PathBuf),
    /// Appending to or replacing the ledger failed.
    #[display("could not write ledger {}", _0.display())]
    Write(#[error(not(source))] PathBuf),
    /// The header is not the standard `Timestamp,Original,Renamed,URL`.
    #[display("unexpected ledger header: {_0}")]
    Header(#[error(not(source))] String),
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Write(_))
    }
}
