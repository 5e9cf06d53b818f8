use bannr_ledger::LedgerRow;
use std::collections::{BTreeSet, HashSet};

/// Who holds a name in the export directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    /// A file on disk that no ledger row refers to.
    Untracked,
    /// The current `renamed` value of a ledger row.
    Ledger,
    /// Claimed by an earlier file of the same batch.
    Batch,
}

/// Names in the export directory that a new file may not silently take.
///
/// A name is occupied when a file with that name exists, when a ledger row
/// is renamed to it, or when an earlier file in the same batch claimed it.
/// Only untracked files on disk may ever be overwritten.
#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    on_disk: BTreeSet<String>,
    tracked: HashSet<String>,
    claimed: HashSet<String>,
}

impl Occupancy {
    pub fn new<'a>(on_disk: BTreeSet<String>, rows: impl IntoIterator<Item = &'a LedgerRow>) -> Self {
        Self {
            on_disk,
            tracked: rows.into_iter().map(|row| row.renamed.clone()).filter(|name| !name.is_empty()).collect(),
            claimed: HashSet::new(),
        }
    }

    pub fn occupant(&self, name: &str) -> Option<Occupant> {
        if self.claimed.contains(name) {
            Some(Occupant::Batch)
        } else if self.tracked.contains(name) {
            Some(Occupant::Ledger)
        } else if self.on_disk.contains(name) {
            Some(Occupant::Untracked)
        } else {
            None
        }
    }

    pub fn claim(&mut self, name: impl Into<String>) {
        self.claimed.insert(name.into());
    }
}
