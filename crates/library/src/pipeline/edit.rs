use super::{load_table, position, require_name, save_table};
use crate::Context;
use crate::error::{ErrorKind, Result};
use crate::upload::{UploadOutcome, upload_one};
use bannr_ledger::LedgerRow;
use bannr_storage::file::extension_of;
use exn::{OptionExt, ResultExt};
use tracing::instrument;

/// The row after an edit, and what happened to a requested upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub row: LedgerRow,
    pub upload: Option<UploadOutcome>,
}

/// Give one exported file a new base name, keeping its extension.
///
/// Fails with [`Conflict`](ErrorKind::Conflict) if the new name is taken by
/// a file or by another row. When `reupload` is set the file is uploaded
/// again under its new name; if that fails the previous URL is kept.
#[instrument(skip_all, fields(%original, %new_base, reupload))]
pub async fn rename_entry(ctx: &Context, original: &str, new_base: &str, reupload: bool) -> Result<EditOutcome> {
    let new_base = require_name(new_base, "new name")?;
    let uploader = if reupload {
        Some(ctx.uploader().ok_or_raise(|| {
            ErrorKind::Configuration("uploads are disabled or no API key is configured".to_string())
        })?)
    } else {
        None
    };
    let mut table = load_table(ctx).await?;
    let index = position(&table.rows, original)?;
    let current = table.rows[index].renamed.clone();
    let source = if current.is_empty() { original } else { current.as_str() };
    let target = format!("{new_base}{}", extension_of(source));
    bannr_storage::validate_name(&target).or_raise(|| ErrorKind::Configuration(format!("invalid name {target:?}")))?;

    if target != current {
        if let Some(owner) = table.rows.iter().find(|row| row.renamed == target) {
            exn::bail!(ErrorKind::Conflict(format!("{target:?} belongs to {:?}", owner.original)));
        }
        if ctx.export.exists(&target).await.or_raise(|| ErrorKind::Storage)? {
            exn::bail!(ErrorKind::Conflict(format!("{target:?} already exists")));
        }
        let present = !current.is_empty() && ctx.export.exists(&current).await.or_raise(|| ErrorKind::Storage)?;
        if present {
            ctx.export.rename(&current, &target).await.or_raise(|| ErrorKind::Rename)?;
            tracing::info!(from = %current, to = %target, "renamed");
        } else {
            tracing::warn!(file = %current, "export file not found, updating the ledger only");
        }
    }

    let upload = match uploader {
        Some((host, credential)) => {
            let result = upload_one(&ctx.export, host, &target, credential).await.map_err(|e| format!("{e:?}"));
            if let Err(reason) = &result {
                tracing::warn!(file = %target, %reason, "re-upload failed, keeping the previous URL");
            }
            Some(UploadOutcome {
                filename: target.clone(),
                result,
            })
        },
        None => None,
    };

    let row = &mut table.rows[index];
    row.renamed = target;
    if let Some(url) = upload.as_ref().and_then(UploadOutcome::url) {
        row.url = url.to_string();
    }
    row.touch();
    let row = row.clone();
    save_table(ctx, &table).await?;
    Ok(EditOutcome { row, upload })
}

/// Upload one exported file again and record its new URL.
#[instrument(skip_all, fields(%original))]
pub async fn reupload_entry(ctx: &Context, original: &str) -> Result<EditOutcome> {
    let (host, credential) = ctx
        .uploader()
        .ok_or_raise(|| ErrorKind::Configuration("uploads are disabled or no API key is configured".to_string()))?;
    let mut table = load_table(ctx).await?;
    let index = position(&table.rows, original)?;
    let filename = table.rows[index].renamed.clone();
    let url = upload_one(&ctx.export, host, &filename, credential).await?;
    tracing::info!(file = %filename, %url, "uploaded");

    let row = &mut table.rows[index];
    row.url = url.clone();
    row.touch();
    let row = row.clone();
    save_table(ctx, &table).await?;
    Ok(EditOutcome {
        row,
        upload: Some(UploadOutcome {
            filename,
            result: Ok(url),
        }),
    })
}

/// Set the URL of one row by hand. A blank URL clears it.
#[instrument(skip_all, fields(%original))]
pub async fn set_url(ctx: &Context, original: &str, url: &str) -> Result<EditOutcome> {
    let mut table = load_table(ctx).await?;
    let index = position(&table.rows, original)?;
    let row = &mut table.rows[index];
    row.url = url.trim().to_string();
    row.touch();
    let row = row.clone();
    save_table(ctx, &table).await?;
    Ok(EditOutcome { row, upload: None })
}
