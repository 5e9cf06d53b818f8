//! Error types for the [`host`](super) module.

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// Why a single upload failed.
///
/// Timeouts and connection failures are kept apart from other request
/// errors so they can be reported differently.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("no API key configured")]
    MissingCredential,
    #[display("could not set up HTTP client")]
    Client,
    #[display("upload timed out")]
    Timeout,
    #[display("could not connect to upload host")]
    Connection,
    #[display("upload request failed")]
    Request,
    /// Host answered with a non-success HTTP status.
    #[display("upload rejected with HTTP status {status}: {reason}")]
    Status { status: u16, reason: String },
    /// Host answered successfully but without a URL.
    #[display("upload response has no URL: {_0}")]
    MissingUrl(#[error(not(source))] String),
    #[display("upload response is not valid JSON")]
    InvalidResponse,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Connection => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::Timeout, true)]
    #[case(ErrorKind::Connection, true)]
    #[case(ErrorKind::Status { status: 503, reason: String::new() }, true)]
    #[case(ErrorKind::Status { status: 429, reason: String::new() }, true)]
    #[case(ErrorKind::Status { status: 401, reason: String::new() }, false)]
    #[case(ErrorKind::MissingCredential, false)]
    #[case(ErrorKind::MissingUrl("nope".to_string()), false)]
    fn test_is_retryable(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_retryable(), expected);
    }
}
