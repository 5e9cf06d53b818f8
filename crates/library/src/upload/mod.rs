//! Concurrent uploads of renamed files.
//!
//! Every file gets its own task; each task reports exactly one
//! [`UploadOutcome`], and a batch never stops because one upload failed.

mod orchestrator;

pub use self::orchestrator::{UploadOutcome, UploadTally, upload_batch, upload_one};
