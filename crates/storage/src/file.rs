//! File metadata returned by storage backend listings, and file name
//! helpers.

use std::path::Path;
use time::OffsetDateTime;

/// A regular file found directly inside a backend's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// File name (no directory components).
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
}
impl FileInfo {
    pub fn new(name: impl Into<String>, size: u64, modified: impl Into<OffsetDateTime>) -> Self {
        Self {
            name: name.into(),
            size,
            modified: modified.into(),
        }
    }
}

/// Extension of a bare file name, including the leading dot.
///
/// Dotfiles without a further dot have no extension, and only the last
/// extension counts (`"a.tar.gz"` → `".gz"`).
pub fn extension_of(name: &str) -> String {
    Path::new(name).extension().and_then(|e| e.to_str()).map(|e| format!(".{e}")).unwrap_or_default()
}

/// File name without its extension (see [`extension_of`]).
pub fn stem_of(name: &str) -> &str {
    let ext = extension_of(name);
    &name[..name.len() - ext.len()]
}
