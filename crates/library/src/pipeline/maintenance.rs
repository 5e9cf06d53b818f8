use super::{load_table, require_name, save_table};
use crate::Context;
use crate::error::{ErrorKind, Result};
use crate::rename::{PlanEntry, PlanStatus, RenamePlan, index_width, sequential_name};
use crate::upload::{UploadTally, upload_batch};
use bannr_ledger::{LedgerRow, LedgerTable};
use exn::OptionExt;
use std::collections::{BTreeSet, HashSet};
use tracing::instrument;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameSummary {
    pub renamed: usize,
    pub unchanged: usize,
    /// Rows whose export file does not exist.
    pub skipped: usize,
    pub errors: usize,
    /// Rows whose `Renamed` column changed.
    pub rows_updated: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSummary {
    /// Rows without a URL.
    pub candidates: usize,
    /// Candidates whose export file is gone; not attempted.
    pub missing: usize,
    pub tally: UploadTally,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    pub rows_removed: usize,
    /// Requested originals with no ledger row.
    pub not_found: usize,
    pub files_deleted: usize,
    pub file_errors: usize,
}

/// Rename every exported file to `{base}{n}{ext}`, in ledger order.
#[instrument(skip_all, fields(%base))]
pub async fn bulk_rename_existing(ctx: &Context, base: &str) -> Result<RenameSummary> {
    let base = require_name(base, "base name")?;
    let mut table = load_table(ctx).await?;
    let selected: Vec<usize> = (0..table.rows.len()).collect();
    rename_rows(ctx, &mut table, &selected, &base).await
}

/// Rename the exported files of the given originals to `{base}{n}{ext}`,
/// numbered in ledger order. Other rows keep their names; a new name that
/// one of them already holds is a [`Conflict`](ErrorKind::Conflict).
#[instrument(skip_all, fields(%base, selected = originals.len()))]
pub async fn bulk_rename_selected(ctx: &Context, originals: &[String], base: &str) -> Result<RenameSummary> {
    let base = require_name(base, "base name")?;
    let mut table = load_table(ctx).await?;
    let wanted: HashSet<&str> = originals.iter().map(String::as_str).collect();
    let selected: Vec<usize> = table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| wanted.contains(row.original.as_str()))
        .map(|(index, _)| index)
        .collect();
    for original in &wanted {
        if table.find(original).is_none() {
            tracing::warn!(%original, "not in the ledger, ignoring");
        }
    }
    if selected.is_empty() {
        exn::bail!(ErrorKind::NotFound(originals.join(", ")));
    }
    rename_rows(ctx, &mut table, &selected, &base).await
}

async fn rename_rows(ctx: &Context, table: &mut LedgerTable, selected: &[usize], base: &str) -> Result<RenameSummary> {
    let mut summary = RenameSummary::default();
    let planned: Vec<usize> = selected.iter().copied().filter(|&i| !table.rows[i].renamed.is_empty()).collect();
    summary.skipped = selected.len() - planned.len();

    let width = index_width(planned.len());
    let entries: Vec<PlanEntry> = planned
        .iter()
        .enumerate()
        .map(|(position, &index)| {
            let row = &table.rows[index];
            let new = sequential_name(base, position + 1, width, &row.renamed);
            PlanEntry::new(index, &row.original, &row.renamed, new)
        })
        .collect();

    let moving: HashSet<usize> = planned.iter().copied().collect();
    for entry in &entries {
        if let Some(owner) = table.rows.iter().enumerate().find(|(i, row)| !moving.contains(i) && row.renamed == entry.new) {
            exn::bail!(ErrorKind::Conflict(format!(
                "{:?} would take {:?}, which belongs to {:?}",
                entry.original, entry.new, owner.1.original
            )));
        }
    }
    let plan = RenamePlan::new(entries)?;

    for entry in plan.execute(&*ctx.export).await {
        match entry.status {
            PlanStatus::Renamed => summary.renamed += 1,
            PlanStatus::Unchanged => summary.unchanged += 1,
            PlanStatus::Skipped => summary.skipped += 1,
            PlanStatus::Planned | PlanStatus::PendingTemp | PlanStatus::Error => summary.errors += 1,
        }
        if let Some(record) = entry.record
            && record != table.rows[entry.row].renamed
        {
            let row = &mut table.rows[entry.row];
            row.renamed = record;
            row.touch();
            summary.rows_updated += 1;
        }
    }
    if summary.rows_updated > 0 {
        save_table(ctx, table).await?;
    }
    tracing::info!(
        renamed = summary.renamed,
        unchanged = summary.unchanged,
        skipped = summary.skipped,
        errors = summary.errors,
        "bulk rename finished"
    );
    Ok(summary)
}

/// Upload every exported file whose ledger row has no URL yet, and record
/// the URLs that come back.
#[instrument(skip_all)]
pub async fn bulk_upload_existing(ctx: &Context) -> Result<UploadSummary> {
    let (host, credential) = ctx
        .uploader()
        .ok_or_raise(|| ErrorKind::Configuration("uploads are disabled or no API key is configured".to_string()))?;
    let mut table = load_table(ctx).await?;
    let mut summary = UploadSummary::default();

    let mut jobs: Vec<(usize, String)> = Vec::new();
    let mut unchecked = 0;
    for (index, row) in table.rows.iter().enumerate().filter(|(_, row)| !row.has_url()) {
        summary.candidates += 1;
        let present = if row.renamed.is_empty() { Ok(false) } else { ctx.export.exists(&row.renamed).await };
        match present {
            Ok(true) => jobs.push((index, row.renamed.clone())),
            Ok(false) => {
                tracing::warn!(original = %row.original, file = %row.renamed, "export file missing, not uploading");
                summary.missing += 1;
            },
            Err(e) => {
                tracing::error!(original = %row.original, file = %row.renamed, error = ?e, "could not check export file");
                unchecked += 1;
            },
        }
    }
    if jobs.is_empty() {
        tracing::info!(candidates = summary.candidates, "nothing to upload");
        summary.tally.failed = unchecked;
        return Ok(summary);
    }

    let filenames = jobs.iter().map(|(_, name)| name.clone()).collect();
    let outcomes = upload_batch(&ctx.export, host, filenames, credential).await;
    summary.tally = UploadTally::of(&outcomes);
    summary.tally.failed += unchecked;
    for ((index, _), outcome) in jobs.into_iter().zip(outcomes) {
        if let Ok(url) = outcome.result {
            let row = &mut table.rows[index];
            row.url = url;
            row.touch();
        }
    }
    if summary.tally.succeeded > 0 {
        save_table(ctx, &table).await?;
    }
    Ok(summary)
}

/// Remove the rows of the given originals from the ledger and, optionally,
/// their export files.
///
/// The ledger is rewritten before any file is deleted. Import files are
/// kept, so a removed original is picked up again by the next run.
#[instrument(skip_all, fields(selected = originals.len(), also_delete_files))]
pub async fn delete_rows(ctx: &Context, originals: &[String], also_delete_files: bool) -> Result<DeleteSummary> {
    let mut table = load_table(ctx).await?;
    let wanted: BTreeSet<&str> = originals.iter().map(String::as_str).collect();
    let (removed, kept): (Vec<LedgerRow>, Vec<LedgerRow>) =
        table.rows.drain(..).partition(|row| wanted.contains(row.original.as_str()));
    table.rows = kept;

    let mut summary = DeleteSummary {
        rows_removed: removed.len(),
        not_found: wanted.iter().filter(|o| !removed.iter().any(|row| row.original == **o)).count(),
        ..Default::default()
    };
    if removed.is_empty() {
        tracing::info!("no matching rows");
        return Ok(summary);
    }
    save_table(ctx, &table).await?;
    tracing::info!(rows = removed.len(), "removed ledger rows");

    if also_delete_files {
        delete_files(ctx, &removed, &mut summary).await;
    }
    Ok(summary)
}

/// Delete the export files of the given originals, leaving the ledger as is.
#[instrument(skip_all, fields(selected = originals.len()))]
pub async fn delete_export_files(ctx: &Context, originals: &[String]) -> Result<DeleteSummary> {
    let table = load_table(ctx).await?;
    let wanted: BTreeSet<&str> = originals.iter().map(String::as_str).collect();
    let matched: Vec<LedgerRow> = table.rows.into_iter().filter(|row| wanted.contains(row.original.as_str())).collect();
    let mut summary = DeleteSummary {
        not_found: wanted.len() - matched.iter().map(|row| row.original.as_str()).collect::<BTreeSet<_>>().len(),
        ..Default::default()
    };
    delete_files(ctx, &matched, &mut summary).await;
    Ok(summary)
}

async fn delete_files(ctx: &Context, rows: &[LedgerRow], summary: &mut DeleteSummary) {
    for row in rows.iter().filter(|row| !row.renamed.is_empty()) {
        match ctx.export.exists(&row.renamed).await {
            Ok(false) => tracing::debug!(file = %row.renamed, "export file already gone"),
            Ok(true) => match ctx.export.delete(&row.renamed).await {
                Ok(()) => {
                    tracing::info!(file = %row.renamed, "deleted export file");
                    summary.files_deleted += 1;
                },
                Err(e) => {
                    tracing::error!(file = %row.renamed, error = ?e, "could not delete export file");
                    summary.file_errors += 1;
                },
            },
            Err(e) => {
                tracing::error!(file = %row.renamed, error = ?e, "could not check export file");
                summary.file_errors += 1;
            },
        }
    }
}
