//! Upload targets for renamed files.

pub mod error;
#[cfg(feature = "mock")]
mod mock;
mod sul;

use self::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[cfg(feature = "mock")]
pub use self::mock::MockHost;
pub use self::sul::{DEFAULT_ENDPOINT, SulClient};

/// A remote service that stores a file and hands back a public URL.
#[async_trait]
pub trait FileHost: Send + Sync {
    /// Upload `data` under `filename` and return the URL it is reachable at.
    ///
    /// One attempt only; a failure is returned to the caller as-is.
    async fn upload(&self, filename: &str, data: Vec<u8>, credential: &str) -> Result<String>;
}

pub type HostHandle = Arc<dyn FileHost + Send + Sync>;
