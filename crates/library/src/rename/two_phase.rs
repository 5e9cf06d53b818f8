use crate::error::{ErrorKind, Result};
use bannr_storage::StorageBackend;
use exn::ResultExt;
use std::collections::{HashMap, HashSet};
use time::OffsetDateTime;
use tracing::instrument;

/// Inserted between the old name and a timestamp to form a temporary name.
pub const TEMP_MARKER: &str = "__bulk_rename_temp_";
/// Candidates tried for one temporary name before the entry fails.
const MAX_TEMP_ATTEMPTS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStatus {
    /// Not executed yet.
    Planned,
    /// Moved aside to a temporary name, waiting for its destination to free up.
    PendingTemp,
    Renamed,
    /// Planned name equals the current one; nothing to do.
    Unchanged,
    /// Source file does not exist; the row is left alone.
    Skipped,
    Error,
}

/// One file of a [`RenamePlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    /// Position of the ledger row this entry belongs to.
    pub row: usize,
    pub original: String,
    pub old: String,
    pub new: String,
    pub status: PlanStatus,
    /// Value the row's `renamed` column should hold after execution. `None`
    /// leaves the row untouched.
    pub record: Option<String>,
    temp: Option<String>,
}

impl PlanEntry {
    pub fn new(row: usize, original: impl Into<String>, old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            row,
            original: original.into(),
            old: old.into(),
            new: new.into(),
            status: PlanStatus::Planned,
            record: None,
            temp: None,
        }
    }
}

/// Collision-safe rename of many files in one directory.
///
/// Names may be permuted among the entries (`a→b`, `b→a`): any entry whose
/// destination is still occupied is first moved to a temporary name and
/// only moved to its final name once every other entry has been displaced.
#[derive(Debug)]
pub struct RenamePlan {
    entries: Vec<PlanEntry>,
}

impl RenamePlan {
    /// Fails with [`Conflict`](ErrorKind::Conflict) if two entries share a
    /// destination. Nothing has been touched at that point.
    pub fn new(entries: Vec<PlanEntry>) -> Result<Self> {
        let mut destinations: HashMap<&str, &str> = HashMap::with_capacity(entries.len());
        for entry in &entries {
            if let Some(other) = destinations.insert(&entry.new, &entry.original) {
                exn::bail!(ErrorKind::Conflict(format!(
                    "{other:?} and {:?} would both be renamed to {:?}",
                    entry.original, entry.new
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Run both phases against `backend` and return every entry with its
    /// final status. Failures are recorded per entry; this never aborts
    /// half-way.
    #[instrument(skip_all, fields(backend = backend.name(), entries = self.entries.len()))]
    pub async fn execute(mut self, backend: &dyn StorageBackend) -> Vec<PlanEntry> {
        let mut temps = HashSet::new();
        for entry in &mut self.entries {
            displace(backend, entry, &mut temps).await;
        }
        for entry in self.entries.iter_mut().filter(|e| e.status == PlanStatus::PendingTemp) {
            finalize(backend, entry).await;
        }
        self.entries
    }
}

async fn displace(backend: &dyn StorageBackend, entry: &mut PlanEntry, temps: &mut HashSet<String>) {
    match backend.exists(&entry.old).await {
        Ok(true) => {},
        Ok(false) => {
            tracing::warn!(original = %entry.original, file = %entry.old, "file to rename not found, skipping");
            entry.status = PlanStatus::Skipped;
            return;
        },
        Err(e) => {
            tracing::error!(original = %entry.original, file = %entry.old, error = ?e, "could not check file");
            entry.status = PlanStatus::Error;
            return;
        },
    }
    if entry.old == entry.new {
        entry.status = PlanStatus::Unchanged;
        return;
    }
    let occupied = match backend.exists(&entry.new).await {
        Ok(occupied) => occupied,
        Err(e) => {
            tracing::error!(original = %entry.original, file = %entry.new, error = ?e, "could not check destination");
            entry.status = PlanStatus::Error;
            return;
        },
    };
    if occupied {
        let temp = match temporary_name(backend, &entry.old, temps).await {
            Ok(temp) => temp,
            Err(e) => {
                tracing::error!(original = %entry.original, file = %entry.old, error = ?e, "no usable temporary name");
                entry.status = PlanStatus::Error;
                return;
            },
        };
        match backend.rename(&entry.old, &temp).await {
            Ok(()) => {
                tracing::debug!(from = %entry.old, temp = %temp, "moved aside");
                entry.status = PlanStatus::PendingTemp;
                entry.record = Some(entry.new.clone());
                entry.temp = Some(temp);
            },
            Err(e) => {
                tracing::error!(from = %entry.old, temp = %temp, error = ?e, "could not move file aside");
                entry.status = PlanStatus::Error;
            },
        }
    } else {
        match backend.rename(&entry.old, &entry.new).await {
            Ok(()) => {
                tracing::info!(from = %entry.old, to = %entry.new, "renamed");
                entry.status = PlanStatus::Renamed;
                entry.record = Some(entry.new.clone());
            },
            Err(e) => {
                tracing::error!(from = %entry.old, to = %entry.new, error = ?e, "could not rename");
                entry.status = PlanStatus::Error;
            },
        }
    }
}

async fn finalize(backend: &dyn StorageBackend, entry: &mut PlanEntry) {
    let Some(temp) = entry.temp.take() else {
        return;
    };
    // Never overwrite: the destination may belong to a file outside the batch.
    let moved = match backend.exists(&entry.new).await {
        Ok(false) => match backend.rename(&temp, &entry.new).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(temp = %temp, to = %entry.new, error = ?e, "could not finalize rename");
                false
            },
        },
        Ok(true) => {
            tracing::error!(temp = %temp, to = %entry.new, "destination still occupied, not overwriting");
            false
        },
        Err(e) => {
            tracing::error!(temp = %temp, to = %entry.new, error = ?e, "could not check destination");
            false
        },
    };
    if moved {
        tracing::info!(from = %entry.old, to = %entry.new, "renamed");
        entry.status = PlanStatus::Renamed;
        return;
    }

    entry.status = PlanStatus::Error;
    let restorable = matches!(backend.exists(&entry.old).await, Ok(false));
    if restorable && backend.rename(&temp, &entry.old).await.is_ok() {
        tracing::warn!(file = %entry.old, "restored original name");
        entry.record = None;
    } else {
        tracing::error!(original = %entry.original, temp = %temp, "could not restore file; recording its temporary name");
        entry.record = Some(temp);
    }
}

/// Unused temporary name for `old`. Fails if the backend cannot be asked
/// about a candidate (e.g. the name is too long) or every candidate is taken.
async fn temporary_name(backend: &dyn StorageBackend, old: &str, temps: &mut HashSet<String>) -> Result<String> {
    let micros = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000;
    let base = format!("{old}{TEMP_MARKER}{micros}");
    for n in 0..MAX_TEMP_ATTEMPTS {
        let candidate = if n == 0 { base.clone() } else { format!("{base}_{n}") };
        if temps.contains(&candidate) {
            continue;
        }
        if !backend.exists(&candidate).await.or_raise(|| ErrorKind::Rename)? {
            temps.insert(candidate.clone());
            return Ok(candidate);
        }
    }
    exn::bail!(ErrorKind::Rename)
}
