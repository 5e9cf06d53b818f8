use super::{load_table, save_table};
use crate::Context;
use crate::error::{ErrorKind, Result};
use crate::rename::copy;
use crate::upload::{UploadTally, upload_batch};
use bannr_storage::StorageBackend;
use derive_more::Display;
use exn::ResultExt;
use std::collections::HashSet;
use time::OffsetDateTime;
use tracing::instrument;

/// Something out of step between the ledger and the two folders. `line` is
/// the row's line in the ledger file; the header is line 1.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum Problem {
    #[display("line {line}: import file {original:?} is missing")]
    MissingImport { line: usize, original: String },
    #[display("line {line}: export file {renamed:?} is missing")]
    MissingExport { line: usize, renamed: String },
    #[display("line {line}: no renamed file recorded for {original:?}")]
    EmptyRenamed { line: usize, original: String },
    #[display("line {line}: {renamed:?} has no URL")]
    MissingUrl { line: usize, renamed: String },
    /// An import file no row lists. [`repair()`] leaves these to the next run.
    #[display("{name:?} in the import folder is not in the ledger ({size} bytes, modified {modified})")]
    Unlisted {
        name: String,
        size: u64,
        modified: OffsetDateTime,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub rows: usize,
    pub problems: Vec<Problem>,
    /// Problems [`repair()`] would fix.
    pub fixable: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairSummary {
    /// Empty `Renamed` fields set to the original name.
    pub renamed_filled: usize,
    /// Export files copied back from the import folder.
    pub exports_restored: usize,
    /// Import files copied back from the export folder.
    pub imports_restored: usize,
    pub errors: usize,
    /// `None` when nothing needed uploading or uploads are unavailable.
    pub uploads: Option<UploadTally>,
}

fn line_of(index: usize) -> usize {
    index + 2
}

async fn present(backend: &dyn StorageBackend, name: &str) -> bannr_storage::error::Result<bool> {
    if name.is_empty() { Ok(false) } else { backend.exists(name).await }
}

/// Compare every ledger row with the import and export folders, and list
/// import files the ledger does not know.
#[instrument(skip_all)]
pub async fn check(ctx: &Context) -> Result<CheckReport> {
    let table = load_table(ctx).await?;
    let can_upload = ctx.uploader().is_some();
    let mut report = CheckReport {
        rows: table.len(),
        ..Default::default()
    };
    let mut problem = |problem: Problem, fixable: bool| {
        report.fixable += usize::from(fixable);
        report.problems.push(problem);
    };

    for (index, row) in table.rows.iter().enumerate() {
        let line = line_of(index);
        let import = present(&*ctx.import, &row.original).await.or_raise(|| ErrorKind::Storage)?;
        let export = present(&*ctx.export, &row.renamed).await.or_raise(|| ErrorKind::Storage)?;
        if !import {
            let original = row.original.clone();
            problem(Problem::MissingImport { line, original }, export && !row.original.is_empty());
        }
        if !export && !row.renamed.is_empty() {
            problem(Problem::MissingExport { line, renamed: row.renamed.clone() }, import);
        }
        if row.renamed.is_empty() {
            let original = row.original.clone();
            problem(Problem::EmptyRenamed { line, original }, !row.original.is_empty());
        }
        if ctx.uploads_enabled && !row.has_url() && export {
            problem(Problem::MissingUrl { line, renamed: row.renamed.clone() }, can_upload);
        }
    }

    let known: HashSet<&str> = table.rows.iter().map(|row| row.original.as_str()).collect();
    let mut files = ctx.import.list().await.or_raise(|| ErrorKind::Storage)?;
    files.sort_by(|a, b| a.name.cmp(&b.name));
    for file in files.into_iter().filter(|file| !known.contains(file.name.as_str())) {
        let (name, size, modified) = (file.name, file.size, file.modified);
        problem(Problem::Unlisted { name, size, modified }, false);
    }
    tracing::info!(problems = report.problems.len(), fixable = report.fixable, "ledger check finished");
    Ok(report)
}

/// Fix what [`check()`] can fix: fill empty `Renamed` fields, copy missing
/// files back from the other folder, and upload files without a URL.
///
/// No file is overwritten. A `Renamed` value another row already holds is
/// not filled in.
#[instrument(skip_all)]
pub async fn repair(ctx: &Context) -> Result<RepairSummary> {
    let mut table = load_table(ctx).await?;
    let mut summary = RepairSummary::default();
    let mut changed = false;
    let mut jobs: Vec<(usize, String)> = Vec::new();

    for index in 0..table.rows.len() {
        let line = line_of(index);
        if table.rows[index].renamed.is_empty() && !table.rows[index].original.is_empty() {
            let original = table.rows[index].original.clone();
            if table.rows.iter().any(|row| row.renamed == original) {
                tracing::warn!(line, %original, "name belongs to another row, leaving Renamed empty");
                summary.errors += 1;
            } else {
                let row = &mut table.rows[index];
                row.renamed = original;
                row.touch();
                summary.renamed_filled += 1;
                changed = true;
            }
        }

        let row = &table.rows[index];
        let (import, mut export) =
            match (present(&*ctx.import, &row.original).await, present(&*ctx.export, &row.renamed).await) {
                (Ok(import), Ok(export)) => (import, export),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::error!(line, original = %row.original, error = ?e, "could not check files");
                    summary.errors += 1;
                    continue;
                },
            };
        if import && !export && !row.renamed.is_empty() {
            match copy(&*ctx.import, &*ctx.export, &row.original, &row.renamed).await {
                Ok(()) => {
                    tracing::info!(line, from = %row.original, to = %row.renamed, "restored export file");
                    summary.exports_restored += 1;
                    export = true;
                },
                Err(e) => {
                    tracing::error!(line, file = %row.renamed, error = ?e, "could not restore export file");
                    summary.errors += 1;
                },
            }
        } else if export && !import && !row.original.is_empty() {
            match copy(&*ctx.export, &*ctx.import, &row.renamed, &row.original).await {
                Ok(()) => {
                    tracing::info!(line, from = %row.renamed, to = %row.original, "restored import file");
                    summary.imports_restored += 1;
                },
                Err(e) => {
                    tracing::error!(line, file = %row.original, error = ?e, "could not restore import file");
                    summary.errors += 1;
                },
            }
        }
        if export && !row.has_url() {
            jobs.push((index, row.renamed.clone()));
        }
    }

    match ctx.uploader() {
        Some((host, credential)) if !jobs.is_empty() => {
            let filenames = jobs.iter().map(|(_, name)| name.clone()).collect();
            let outcomes = upload_batch(&ctx.export, host, filenames, credential).await;
            summary.uploads = Some(UploadTally::of(&outcomes));
            for ((index, _), outcome) in jobs.into_iter().zip(outcomes) {
                if let Ok(url) = outcome.result {
                    let row = &mut table.rows[index];
                    row.url = url;
                    row.touch();
                    changed = true;
                }
            }
        },
        None if !jobs.is_empty() => {
            tracing::info!(files = jobs.len(), "uploads disabled or no API key configured; not uploading");
        },
        _ => {},
    }

    if changed {
        save_table(ctx, &table).await?;
    }
    Ok(summary)
}
