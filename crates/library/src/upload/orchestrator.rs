use crate::error::{ErrorKind, Result};
use bannr_remote::HostHandle;
use bannr_storage::BackendHandle;
use exn::ResultExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::instrument;

/// What happened to one file of an upload batch: its URL, or why it has
/// none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub filename: String,
    pub result: std::result::Result<String, String>,
}

impl UploadOutcome {
    pub fn url(&self) -> Option<&str> {
        self.result.as_deref().ok()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadTally {
    pub succeeded: usize,
    pub failed: usize,
}

impl UploadTally {
    pub fn of(outcomes: &[UploadOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count();
        Self {
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }
}

/// Upload a single file from `export`. One attempt, no retries.
pub async fn upload_one(export: &BackendHandle, host: &HostHandle, filename: &str, credential: &str) -> Result<String> {
    if credential.trim().is_empty() {
        exn::bail!(ErrorKind::Configuration("no API key configured".to_string()));
    }
    if !export.exists(filename).await.or_raise(|| ErrorKind::Upload)? {
        exn::bail!(ErrorKind::NotFound(filename.to_string()));
    }
    let data = export.read(filename).await.or_raise(|| ErrorKind::Upload)?;
    host.upload(filename, data, credential).await.or_raise(|| ErrorKind::Upload)
}

/// Upload every file concurrently, one task per file.
///
/// Outcomes are returned in the order of `filenames`, exactly one per file.
/// A task that panics is reported as a failure for its file.
#[instrument(skip_all, fields(files = filenames.len()))]
pub async fn upload_batch(
    export: &BackendHandle,
    host: &HostHandle,
    filenames: Vec<String>,
    credential: &str,
) -> Vec<UploadOutcome> {
    let (sender, mut receiver) = mpsc::unbounded_channel::<(usize, UploadOutcome)>();
    let mut tasks = JoinSet::new();
    for (index, filename) in filenames.iter().cloned().enumerate() {
        let (export, host, sender) = (export.clone(), host.clone(), sender.clone());
        let credential = credential.to_string();
        tasks.spawn(async move {
            let result = upload_one(&export, &host, &filename, &credential).await.map_err(|e| format!("{e:?}"));
            // Receiver outlives every task; a send error cannot happen.
            let _ = sender.send((index, UploadOutcome { filename, result }));
        });
    }
    // Only the tasks hold senders now, so the channel closes once all finish.
    drop(sender);

    let mut slots: Vec<Option<UploadOutcome>> = vec![None; filenames.len()];
    while let Some((index, outcome)) = receiver.recv().await {
        match &outcome.result {
            Ok(url) => tracing::info!(file = %outcome.filename, %url, "uploaded"),
            Err(reason) => tracing::warn!(file = %outcome.filename, %reason, "upload failed"),
        }
        slots[index] = Some(outcome);
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "upload task did not complete");
        }
    }

    let outcomes: Vec<UploadOutcome> = slots
        .into_iter()
        .zip(filenames)
        .map(|(slot, filename)| {
            slot.unwrap_or_else(|| UploadOutcome {
                filename,
                result: Err("upload task panicked".to_string()),
            })
        })
        .collect();
    let tally = UploadTally::of(&outcomes);
    tracing::info!(succeeded = tally.succeeded, failed = tally.failed, "upload batch finished");
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bannr_remote::FileHost;
    use bannr_remote::host::MockHost;
    use bannr_remote::host::error::Result as HostResult;
    use bannr_storage::backend::MockBackend;
    use std::sync::Arc;

    fn export(names: &[&str]) -> BackendHandle {
        Arc::new(MockBackend::with_files(names.iter().map(|n| (n.to_string(), b"PNG".to_vec()))))
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| n.to_string()).collect()
    }

    /// Panics when asked to upload one particular file.
    struct Exploding;

    #[async_trait]
    impl FileHost for Exploding {
        async fn upload(&self, filename: &str, _data: Vec<u8>, _credential: &str) -> HostResult<String> {
            if filename == "boom.png" {
                panic!("host exploded");
            }
            Ok(MockHost::url_for(filename))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_outcomes_in_input_order() {
        let files: Vec<String> = (1..=25).map(|i| format!("T{i:02}.png")).collect();
        let export: BackendHandle = Arc::new(MockBackend::with_files(files.iter().map(|f| (f.clone(), b"x".to_vec()))));
        let host: HostHandle = Arc::new(MockHost::default());
        let outcomes = upload_batch(&export, &host, files.clone(), "key").await;
        let returned: Vec<_> = outcomes.iter().map(|o| o.filename.clone()).collect();
        assert_eq!(returned, files);
        assert!(outcomes.iter().all(|o| o.url() == Some(MockHost::url_for(&o.filename).as_str())));
    }

    #[tokio::test]
    async fn test_partial_failure() {
        let export = export(&["a.png", "b.png", "c.png"]);
        let host: HostHandle = Arc::new(MockHost::default().failing(["b.png"]));
        let outcomes = upload_batch(&export, &host, names(&["a.png", "b.png", "c.png", "missing.png"]), "key").await;
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        assert!(outcomes[2].result.is_ok());
        assert!(outcomes[3].result.is_err());
        assert_eq!(UploadTally::of(&outcomes), UploadTally { succeeded: 2, failed: 2 });
    }

    #[tokio::test]
    async fn test_panicking_task_still_reports() {
        let export = export(&["ok.png", "boom.png"]);
        let host: HostHandle = Arc::new(Exploding);
        let outcomes = upload_batch(&export, &host, names(&["ok.png", "boom.png"]), "key").await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].result.is_ok());
        assert_eq!(outcomes[1].filename, "boom.png");
        assert!(outcomes[1].result.is_err());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let host: HostHandle = Arc::new(MockHost::default());
        assert!(upload_batch(&export(&[]), &host, Vec::new(), "key").await.is_empty());
    }

    #[tokio::test]
    async fn test_upload_one_preconditions() {
        let export = export(&["a.png"]);
        let host: HostHandle = Arc::new(MockHost::default());
        let err = upload_one(&export, &host, "a.png", " ").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Configuration(_)));
        let err = upload_one(&export, &host, "nope.png", "key").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        assert_eq!(upload_one(&export, &host, "a.png", "key").await.unwrap(), MockHost::url_for("a.png"));
    }
}
