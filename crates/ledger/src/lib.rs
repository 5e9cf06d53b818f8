//! CSV ledger of processed files.
//!
//! The ledger is the single source of truth for "what has been processed":
//! one row per original file name, recording what it was renamed to and
//! where it was uploaded. New rows are only ever appended; maintenance
//! actions read the whole table, change it in memory and write it back in
//! one go.

pub mod error;
mod ledger;
mod row;
pub mod timestamp;

pub use crate::ledger::Ledger;
pub use crate::row::{HEADER, LedgerRow, LedgerTable};
