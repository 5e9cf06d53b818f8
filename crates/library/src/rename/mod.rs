//! Assigning canonical names to files.
//!
//! New files are copied from the import directory into the export
//! directory under their new name by [`rename_new_files`]. Files already in
//! the export directory are renamed in place by a [`RenamePlan`], which can
//! permute names among its entries without losing a file.

mod batch;
mod naming;
mod occupancy;
mod two_phase;

pub(crate) use self::batch::copy;
pub use self::batch::{BatchReport, RenamedFile, rename_new_files};
pub use self::naming::{
    ConflictChoice, MAX_INTERACTIVE_ATTEMPTS, MAX_SEQUENTIAL_CONFLICTS, NameDecider, NamingPolicy, index_width,
    sequential_name,
};
pub use self::occupancy::{Occupancy, Occupant};
pub use self::two_phase::{PlanEntry, PlanStatus, RenamePlan, TEMP_MARKER};
