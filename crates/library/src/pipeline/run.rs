use super::RunStage;
use crate::Context;
use crate::error::{ErrorKind, Result};
use crate::reconcile::{Reconciliation, reconcile};
use crate::rename::{NamingPolicy, Occupancy, rename_new_files};
use crate::upload::{UploadTally, upload_batch};
use bannr_ledger::LedgerRow;
use exn::ResultExt;
use std::collections::HashSet;
use tracing::instrument;

/// Where a run looks for new files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Sync the remote folder into the import directory first.
    Remote,
    /// Use whatever is already in the import directory.
    Local,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Files found in the import directory.
    pub discovered: usize,
    /// Files skipped because the ledger already knows them.
    pub already_known: usize,
    /// Files renamed and recorded in the ledger.
    pub processed: usize,
    /// New files that vanished before they could be copied.
    pub skipped: usize,
    /// New files that could not be renamed.
    pub errors: usize,
    /// `None` when the upload stage did not run.
    pub uploads: Option<UploadTally>,
}

/// Process every file in the import directory that the ledger does not know
/// about yet.
///
/// Sync or listing failures abort before any file is touched. Rename and
/// upload failures only affect their own file; every renamed file is logged,
/// with an empty URL if it was not uploaded.
#[instrument(skip_all, fields(source = ?source))]
pub async fn run(ctx: &Context, source: Source, policy: &mut NamingPolicy) -> Result<RunSummary> {
    if let NamingPolicy::Sequential { base } = policy
        && base.trim().is_empty()
    {
        exn::bail!(ErrorKind::Configuration("base name cannot be empty".to_string()));
    }
    let mut summary = RunSummary::default();

    RunStage::Reconciling.enter();
    if source == Source::Remote {
        let (Some(sync), Some(folder)) = (&ctx.sync, ctx.remote_folder.as_deref().filter(|f| !f.trim().is_empty()))
        else {
            exn::bail!(ErrorKind::Configuration("no remote folder configured".to_string()));
        };
        sync.sync_folder(folder, &*ctx.import).await.or_raise(|| ErrorKind::Sync)?;
    }
    let discovered = ctx.import.list_names().await.or_raise(|| ErrorKind::Storage)?;
    let known = match ctx.ledger.known_originals().await {
        Ok(known) => known,
        Err(e) => {
            tracing::warn!(error = ?e, "could not read ledger; treating every file as new");
            HashSet::new()
        },
    };
    summary.discovered = discovered.len();
    let Reconciliation { pending, already_known } = reconcile(discovered, &known);
    summary.already_known = already_known;
    tracing::info!(discovered = summary.discovered, already_known, pending = pending.len(), "reconciled");
    if pending.is_empty() {
        tracing::info!("no new files found requiring processing");
        RunStage::Idle.enter();
        return Ok(summary);
    }

    RunStage::Renaming.enter();
    let rows = match ctx.ledger.read_all().await {
        Ok(table) => table.rows,
        Err(e) => {
            tracing::warn!(error = ?e, "could not read ledger rows; only files on disk count as taken names");
            Vec::new()
        },
    };
    let on_disk = ctx.export.list_names().await.or_raise(|| ErrorKind::Storage)?;
    let mut occupancy = Occupancy::new(on_disk, &rows);
    let report = rename_new_files(&*ctx.import, &*ctx.export, &pending, policy, &mut occupancy).await;
    summary.skipped = report.skipped.len();
    summary.errors = report.failed.len();
    if report.renamed.is_empty() {
        RunStage::Idle.enter();
        return Ok(summary);
    }

    let urls: Vec<String> = match ctx.uploader() {
        Some((host, credential)) => {
            RunStage::Uploading.enter();
            let filenames = report.renamed.iter().map(|file| file.renamed.clone()).collect();
            let outcomes = upload_batch(&ctx.export, host, filenames, credential).await;
            summary.uploads = Some(UploadTally::of(&outcomes));
            outcomes.into_iter().map(|outcome| outcome.result.unwrap_or_default()).collect()
        },
        None => {
            tracing::info!("uploads disabled or no API key configured; skipping upload stage");
            vec![String::new(); report.renamed.len()]
        },
    };

    RunStage::Logging.enter();
    let rows: Vec<LedgerRow> =
        report.renamed.iter().zip(urls).map(|(file, url)| LedgerRow::new(&file.original, &file.renamed, url)).collect();
    ctx.ledger.append(&rows).await.or_raise(|| ErrorKind::Write)?;
    summary.processed = rows.len();
    tracing::info!(rows = rows.len(), "logged new files");

    RunStage::Idle.enter();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rename::{ConflictChoice, NameDecider};
    use crate::testing::Fixture;
    use bannr_remote::host::MockHost;
    use bannr_remote::sync::MockSync;
    use bannr_storage::StorageBackend;
    use std::sync::Arc;

    struct KeepNames;

    impl NameDecider for KeepNames {
        fn name_for(&mut self, _original: &str) -> Option<String> {
            None
        }

        fn on_conflict(&mut self, _original: &str, _candidate: &str) -> ConflictChoice {
            ConflictChoice::Retry
        }
    }

    #[tokio::test]
    async fn test_local_run_renames_uploads_and_logs() {
        let fixture = Fixture::new(&["x.png", "y.png"], &[]);
        let ctx = fixture.context();
        let summary = run(&ctx, Source::Local, &mut NamingPolicy::sequential("T")).await.unwrap();
        assert_eq!(summary.discovered, 2);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.uploads, Some(UploadTally { succeeded: 2, failed: 0 }));

        let table = ctx.ledger.read_all().await.unwrap();
        let rows: Vec<_> = table.rows.iter().map(|r| (r.original.as_str(), r.renamed.as_str(), r.url.as_str())).collect();
        assert_eq!(
            rows,
            [
                ("x.png", "T1.png", "https://mock.invalid/T1.png"),
                ("y.png", "T2.png", "https://mock.invalid/T2.png")
            ]
        );
        assert_eq!(fixture.export.names().await, ["T1.png", "T2.png"]);
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let fixture = Fixture::new(&["x.png", "y.png"], &[]);
        let ctx = fixture.context();
        run(&ctx, Source::Local, &mut NamingPolicy::sequential("T")).await.unwrap();
        let before = std::fs::read(ctx.ledger.path()).unwrap();
        let summary = run(&ctx, Source::Local, &mut NamingPolicy::sequential("T")).await.unwrap();
        assert_eq!(summary.already_known, 2);
        assert_eq!(summary.processed, 0);
        assert_eq!(std::fs::read(ctx.ledger.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_partial_upload_failure_logs_every_file() {
        let host = MockHost::default().failing(["T2.png"]);
        let fixture = Fixture::with_host(&["a.png", "b.png", "c.png"], &[], host);
        let ctx = fixture.context();
        let summary = run(&ctx, Source::Local, &mut NamingPolicy::sequential("T")).await.unwrap();
        assert_eq!(summary.uploads, Some(UploadTally { succeeded: 2, failed: 1 }));
        let table = ctx.ledger.read_all().await.unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows.iter().filter(|r| r.has_url()).count(), 2);
        assert_eq!(table.find("b.png").unwrap().url, "");
    }

    #[tokio::test]
    async fn test_uploads_disabled_still_logs() {
        let fixture = Fixture::new(&["a.png"], &[]);
        let ctx = fixture.context().with_uploads_enabled(false);
        let summary = run(&ctx, Source::Local, &mut NamingPolicy::interactive(KeepNames)).await.unwrap();
        assert_eq!(summary.uploads, None);
        assert!(fixture.host.uploaded().await.is_empty());
        let table = ctx.ledger.read_all().await.unwrap();
        assert_eq!(table.rows[0].renamed, "a.png");
        assert_eq!(table.rows[0].url, "");
    }

    #[tokio::test]
    async fn test_only_new_files_processed() {
        let fixture = Fixture::new(&["a.jpg", "b.jpg"], &["a.jpg"]);
        let ctx = fixture.context_without_uploads();
        ctx.ledger.append(&[LedgerRow::new("a.jpg", "a.jpg", "")]).await.unwrap();
        let summary = run(&ctx, Source::Local, &mut NamingPolicy::interactive(KeepNames)).await.unwrap();
        assert_eq!(summary.already_known, 1);
        assert_eq!(summary.processed, 1);
        let originals: Vec<_> = ctx.ledger.read_all().await.unwrap().rows.into_iter().map(|r| r.original).collect();
        assert_eq!(originals, ["a.jpg", "b.jpg"]);
    }

    #[tokio::test]
    async fn test_new_names_avoid_ledger_names() {
        // T1.png is owned by an existing row even though its file is gone.
        let fixture = Fixture::new(&["old.png", "new.png"], &[]);
        let ctx = fixture.context_without_uploads();
        ctx.ledger.append(&[LedgerRow::new("old.png", "T1.png", "")]).await.unwrap();
        run(&ctx, Source::Local, &mut NamingPolicy::sequential("T")).await.unwrap();
        let table = ctx.ledger.read_all().await.unwrap();
        assert_eq!(table.find("new.png").unwrap().renamed, "T1_conflict_1.png");
    }

    #[tokio::test]
    async fn test_unreadable_ledger_degrades_to_empty() {
        let fixture = Fixture::new(&["a.png"], &[]);
        let ctx = fixture.context_without_uploads();
        std::fs::write(ctx.ledger.path(), "Nothing,Useful\n").unwrap();
        let summary = run(&ctx, Source::Local, &mut NamingPolicy::sequential("T")).await.unwrap();
        assert_eq!(summary.processed, 1);
    }

    #[tokio::test]
    async fn test_remote_run_syncs_first() {
        let fixture = Fixture::new(&[], &[]);
        let ctx = fixture
            .context_without_uploads()
            .with_sync(Arc::new(MockSync::with_files([("drive.png", b"PNG")])), Some("1AbC".to_string()));
        let summary = run(&ctx, Source::Remote, &mut NamingPolicy::sequential("T")).await.unwrap();
        assert_eq!(summary.processed, 1);
        assert!(fixture.import.exists("drive.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_remote_run_failures_abort_before_touching_files() {
        let fixture = Fixture::new(&["a.png"], &[]);
        let no_folder = fixture.context_without_uploads().with_sync(Arc::new(MockSync::default()), None);
        let err = run(&no_folder, Source::Remote, &mut NamingPolicy::sequential("T")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Configuration(_)));

        let failing = fixture.context_without_uploads().with_sync(Arc::new(MockSync::failing()), Some("1AbC".to_string()));
        let err = run(&failing, Source::Remote, &mut NamingPolicy::sequential("T")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Sync));
        assert!(fixture.export.names().await.is_empty());
        assert!(!failing.ledger.path().exists());
    }

    #[tokio::test]
    async fn test_blank_base_rejected() {
        let fixture = Fixture::new(&["a.png"], &[]);
        let err = run(&fixture.context(), Source::Local, &mut NamingPolicy::sequential("  ")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Configuration(_)));
    }
}
