//! Entry points tying the reconciler, rename engine, upload orchestrator
//! and ledger together.

mod check;
mod edit;
mod maintenance;
mod run;
mod stats;

pub use self::check::{CheckReport, Problem, RepairSummary, check, repair};
pub use self::edit::{EditOutcome, rename_entry, reupload_entry, set_url};
pub use self::maintenance::{
    DeleteSummary, RenameSummary, UploadSummary, bulk_rename_existing, bulk_rename_selected, bulk_upload_existing,
    delete_export_files, delete_rows,
};
pub use self::run::{RunSummary, Source, run};
pub use self::stats::{Stats, stats};
use crate::Context;
use crate::error::{ErrorKind, Result};
use bannr_ledger::{LedgerRow, LedgerTable};
use derive_more::Display;
use exn::ResultExt;

/// Stages of a new-file run, in order. Each transition is logged.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    #[display("idle")]
    Idle,
    #[display("reconciling")]
    Reconciling,
    #[display("renaming")]
    Renaming,
    #[display("uploading")]
    Uploading,
    #[display("logging")]
    Logging,
}

impl RunStage {
    pub(crate) fn enter(self) {
        tracing::info!(stage = %self, "pipeline stage");
    }
}

/// Read the whole ledger for a maintenance action, refusing non-standard
/// headers.
async fn load_table(ctx: &Context) -> Result<LedgerTable> {
    let table = ctx.ledger.read_all().await.or_raise(|| ErrorKind::Read)?;
    table.ensure_standard_header().or_raise(|| ErrorKind::Read)?;
    if table.malformed > 0 {
        tracing::warn!(malformed = table.malformed, "malformed ledger rows will be dropped when the ledger is rewritten");
    }
    Ok(table)
}

async fn save_table(ctx: &Context, table: &LedgerTable) -> Result<()> {
    ctx.ledger.rewrite_all(table.columns.as_slice(), &table.rows).await.or_raise(|| ErrorKind::Write)
}

fn position(rows: &[LedgerRow], original: &str) -> Result<usize> {
    match rows.iter().position(|row| row.original == original) {
        Some(index) => Ok(index),
        None => exn::bail!(ErrorKind::NotFound(original.to_string())),
    }
}

fn require_name(value: &str, what: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        exn::bail!(ErrorKind::Configuration(format!("{what} cannot be empty")));
    }
    Ok(value.to_string())
}
