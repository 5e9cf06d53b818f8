use super::load_table;
use crate::Context;
use crate::error::{ErrorKind, Result};
use bannr_storage::BackendHandle;
use exn::ResultExt;
use futures::{StreamExt, TryStreamExt, stream};

const CONCURRENT_CHECKS: usize = 16;

/// Ledger rows, and how many of them still have their files and a URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub rows: usize,
    pub import_found: usize,
    pub export_found: usize,
    pub with_url: usize,
}

pub async fn stats(ctx: &Context) -> Result<Stats> {
    let table = load_table(ctx).await?;
    let originals = table.rows.iter().map(|row| row.original.clone()).collect();
    let renamed = table.rows.iter().map(|row| row.renamed.clone()).collect();
    Ok(Stats {
        rows: table.len(),
        import_found: count_present(&ctx.import, originals).await?,
        export_found: count_present(&ctx.export, renamed).await?,
        with_url: table.rows.iter().filter(|row| row.has_url()).count(),
    })
}

async fn count_present(backend: &BackendHandle, names: Vec<String>) -> Result<usize> {
    stream::iter(names)
        .map(|name| async move { if name.is_empty() { Ok(false) } else { backend.exists(&name).await } })
        .buffered(CONCURRENT_CHECKS)
        .try_fold(0, |count, present| std::future::ready(Ok(count + usize::from(present))))
        .await
        .or_raise(|| ErrorKind::Storage)
}
