//! Remote collaborators: where renamed files are uploaded to
//! ([`FileHost`]) and where new files are pulled from ([`FolderSync`]).

pub mod host;
pub mod sync;

pub use crate::host::{FileHost, HostHandle, SulClient};
pub use crate::sync::{FolderSync, GdownSync, SyncHandle};
