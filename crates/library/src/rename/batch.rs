use super::naming::{ConflictChoice, MAX_INTERACTIVE_ATTEMPTS, MAX_SEQUENTIAL_CONFLICTS, NameDecider, NamingPolicy, index_width};
use super::occupancy::{Occupancy, Occupant};
use bannr_storage::StorageBackend;
use bannr_storage::file::{extension_of, stem_of};
use tracing::instrument;

/// A new file copied into the export directory under its new name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamedFile {
    pub original: String,
    pub renamed: String,
}

/// Per-file results of [`rename_new_files`].
#[derive(Debug, Default)]
pub struct BatchReport {
    pub renamed: Vec<RenamedFile>,
    /// Source file vanished before it could be copied.
    pub skipped: Vec<String>,
    /// No usable name could be found, or the copy failed.
    pub failed: Vec<String>,
}

/// Copy each pending file from `import` to `export` under a name chosen by
/// `policy`, never taking a name the [`Occupancy`] says is in use (except
/// overwriting untracked files when an interactive decider asks to).
///
/// Files are processed in the order given; a failure only affects its own
/// file. The import copy is left in place.
#[instrument(skip_all, fields(files = pending.len()))]
pub async fn rename_new_files(
    import: &dyn StorageBackend,
    export: &dyn StorageBackend,
    pending: &[String],
    policy: &mut NamingPolicy,
    occupancy: &mut Occupancy,
) -> BatchReport {
    let mut report = BatchReport::default();
    let width = index_width(pending.len());

    for (position, original) in pending.iter().enumerate() {
        match import.exists(original).await {
            Ok(true) => {},
            Ok(false) => {
                tracing::warn!(file = %original, "source file not found, skipping");
                report.skipped.push(original.clone());
                continue;
            },
            Err(e) => {
                tracing::error!(file = %original, error = ?e, "could not check source file");
                report.failed.push(original.clone());
                continue;
            },
        }
        let chosen = match policy {
            NamingPolicy::Interactive(decider) => choose_interactive(decider.as_mut(), original, occupancy),
            NamingPolicy::Sequential { base } => choose_sequential(base, position + 1, width, original, occupancy),
        };
        let Some(renamed) = chosen else {
            tracing::error!(file = %original, "too many filename conflicts, skipping");
            report.failed.push(original.clone());
            continue;
        };
        if let Err(e) = copy(import, export, original, &renamed).await {
            tracing::error!(file = %original, renamed = %renamed, error = ?e, "could not copy file");
            report.failed.push(original.clone());
            continue;
        }
        tracing::info!(file = %original, renamed = %renamed, "copied and renamed");
        occupancy.claim(renamed.clone());
        report.renamed.push(RenamedFile {
            original: original.clone(),
            renamed,
        });
    }
    tracing::info!(renamed = report.renamed.len(), skipped = report.skipped.len(), failed = report.failed.len(), "rename batch finished");
    report
}

/// Copy `from_name` in `from` to `to_name` in `to`.
pub(crate) async fn copy(
    from: &dyn StorageBackend,
    to: &dyn StorageBackend,
    from_name: &str,
    to_name: &str,
) -> bannr_storage::error::Result<()> {
    let data = from.read(from_name).await?;
    to.write(to_name, &data).await
}

fn choose_interactive(decider: &mut dyn NameDecider, original: &str, occupancy: &Occupancy) -> Option<String> {
    let ext = extension_of(original);
    let custom = decider.name_for(original).map(|name| name.trim().to_string()).filter(|name| !name.is_empty());
    let mut candidate = match &custom {
        Some(base) => format!("{base}{ext}"),
        None => original.to_string(),
    };
    let base = custom.unwrap_or_else(|| stem_of(original).to_string());

    for attempt in 1..=MAX_INTERACTIVE_ATTEMPTS + 1 {
        match occupancy.occupant(&candidate) {
            None => return Some(candidate),
            Some(Occupant::Untracked) => {
                if decider.on_conflict(original, &candidate) == ConflictChoice::Overwrite {
                    tracing::info!(file = %original, renamed = %candidate, "overwriting existing file");
                    return Some(candidate);
                }
            },
            // Names owned by the ledger or this batch are never overwritten.
            Some(occupant) => tracing::warn!(file = %original, candidate = %candidate, ?occupant, "name already in use"),
        }
        if attempt > MAX_INTERACTIVE_ATTEMPTS {
            break;
        }
        candidate = format!("{base}_{attempt}{ext}");
        tracing::info!(file = %original, candidate = %candidate, "trying new name");
    }
    None
}

fn choose_sequential(base: &str, index: usize, width: usize, original: &str, occupancy: &Occupancy) -> Option<String> {
    let ext = extension_of(original);
    let stem = format!("{base}{index:0width$}");
    let first = format!("{stem}{ext}");
    let candidates =
        std::iter::once(first).chain((1..=MAX_SEQUENTIAL_CONFLICTS).map(|n| format!("{stem}_conflict_{n}{ext}")));
    for candidate in candidates {
        match occupancy.occupant(&candidate) {
            None => return Some(candidate),
            Some(occupant) => tracing::warn!(file = %original, candidate = %candidate, ?occupant, "name already in use"),
        }
    }
    None
}
