//! In-memory upload host for testing.

use super::FileHost;
use super::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::Mutex;

/// Upload host that never touches the network.
///
/// Every upload succeeds with `https://mock.invalid/<filename>` unless the
/// file name was registered with [`failing()`](Self::failing). Received
/// uploads are recorded for assertions.
#[derive(Default)]
pub struct MockHost {
    failing: HashSet<String>,
    uploads: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MockHost {
    pub fn url_for(filename: &str) -> String {
        format!("https://mock.invalid/{filename}")
    }

    /// Make uploads of these file names fail with an HTTP 500.
    pub fn failing(mut self, filenames: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.failing.extend(filenames.into_iter().map(Into::into));
        self
    }

    /// File names uploaded so far, in order of arrival.
    pub async fn uploaded(&self) -> Vec<String> {
        self.uploads.lock().await.iter().map(|(name, _)| name.clone()).collect()
    }
}

#[async_trait]
impl FileHost for MockHost {
    async fn upload(&self, filename: &str, data: Vec<u8>, credential: &str) -> Result<String> {
        if credential.trim().is_empty() {
            exn::bail!(ErrorKind::MissingCredential);
        }
        // Let other uploads interleave, like a real network call would.
        tokio::task::yield_now().await;
        self.uploads.lock().await.push((filename.to_string(), data));
        if self.failing.contains(filename) {
            exn::bail!(ErrorKind::Status {
                status: 500,
                reason: "mock failure".to_string()
            });
        }
        Ok(Self::url_for(filename))
    }
}
