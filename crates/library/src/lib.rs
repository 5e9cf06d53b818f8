//! The bannr pipeline: find new source images, give them their canonical
//! names, upload them, and record the outcome in the ledger.
//!
//! Every entry point takes an explicit [`Context`]; there is no global
//! state.

pub mod error;
pub mod pipeline;
mod reconcile;
pub mod rename;
pub mod upload;

pub use crate::pipeline::{
    CheckReport, DeleteSummary, EditOutcome, Problem, RenameSummary, RepairSummary, RunStage, RunSummary, Source, Stats,
    UploadSummary, bulk_rename_existing, bulk_rename_selected, bulk_upload_existing, check, delete_export_files,
    delete_rows, rename_entry, repair, reupload_entry, run, set_url, stats,
};
pub use crate::reconcile::{Reconciliation, reconcile};
pub use crate::rename::{ConflictChoice, NameDecider, NamingPolicy};
use bannr_ledger::Ledger;
use bannr_remote::{HostHandle, SyncHandle};
use bannr_storage::BackendHandle;

/// Collaborators and switches for a pipeline run.
pub struct Context {
    /// Where source files are synced to and discovered in.
    pub import: BackendHandle,
    /// Where renamed copies are written and uploaded from.
    pub export: BackendHandle,
    pub ledger: Ledger,
    pub host: Option<HostHandle>,
    pub credential: Option<String>,
    pub uploads_enabled: bool,
    pub sync: Option<SyncHandle>,
    /// Remote folder to pull new files from.
    pub remote_folder: Option<String>,
}

impl Context {
    pub fn new(import: BackendHandle, export: BackendHandle, ledger: Ledger) -> Self {
        Self {
            import,
            export,
            ledger,
            host: None,
            credential: None,
            uploads_enabled: true,
            sync: None,
            remote_folder: None,
        }
    }

    pub fn with_host(mut self, host: HostHandle, credential: Option<String>) -> Self {
        self.host = Some(host);
        self.credential = credential;
        self
    }

    pub fn with_sync(mut self, sync: SyncHandle, remote_folder: Option<String>) -> Self {
        self.sync = Some(sync);
        self.remote_folder = remote_folder;
        self
    }

    pub fn with_uploads_enabled(mut self, enabled: bool) -> Self {
        self.uploads_enabled = enabled;
        self
    }

    /// Host and credential, when uploading is enabled and possible.
    pub fn uploader(&self) -> Option<(&HostHandle, &str)> {
        if !self.uploads_enabled {
            return None;
        }
        let credential = self.credential.as_deref().map(str::trim).filter(|c| !c.is_empty())?;
        Some((self.host.as_ref()?, credential))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Context;
    use bannr_ledger::Ledger;
    use bannr_remote::host::MockHost;
    use bannr_storage::backend::MockBackend;
    use std::sync::Arc;

    /// In-memory import/export directories, a real ledger file in a
    /// temporary directory and a mock upload host.
    pub(crate) struct Fixture {
        pub dir: tempfile::TempDir,
        pub import: Arc<MockBackend>,
        pub export: Arc<MockBackend>,
        pub host: Arc<MockHost>,
    }

    impl Fixture {
        pub(crate) fn new(import: &[&str], export: &[&str]) -> Self {
            Self::with_host(import, export, MockHost::default())
        }

        pub(crate) fn with_host(import: &[&str], export: &[&str], host: MockHost) -> Self {
            let contents = |names: &[&str]| names.iter().map(|n| (n.to_string(), n.as_bytes().to_vec())).collect::<Vec<_>>();
            Self {
                dir: tempfile::tempdir().unwrap(),
                import: Arc::new(MockBackend::with_files(contents(import)).with_name("import")),
                export: Arc::new(MockBackend::with_files(contents(export)).with_name("export")),
                host: Arc::new(host),
            }
        }

        pub(crate) fn ledger(&self) -> Ledger {
            Ledger::new(self.dir.path().join("index.csv"))
        }

        /// Context with uploads enabled and a credential.
        pub(crate) fn context(&self) -> Context {
            Context::new(self.import.clone(), self.export.clone(), self.ledger())
                .with_host(self.host.clone(), Some("secret".to_string()))
        }

        pub(crate) fn context_without_uploads(&self) -> Context {
            Context::new(self.import.clone(), self.export.clone(), self.ledger())
        }
    }
}
