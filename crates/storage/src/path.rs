//! File name validation.
//!
//! Every backend is a single flat directory: names must be exactly one
//! normal path component so that nothing can escape (or descend below) the
//! backend root.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path};

/// Validates a file name for use with a flat storage backend.
///
/// > **Note:** Leading and trailing whitespace is significant and is **not**
/// >           trimmed; callers decide what a "blank" name means.
///
/// # Examples
///
/// ```
/// use bannr_storage::validate_name;
/// // Valid names
/// assert!(validate_name("TEAM01.png").is_ok());
/// assert!(validate_name("no extension").is_ok());
/// assert!(validate_name(".hidden").is_ok());
/// // Invalid names
/// assert!(validate_name("../etc/passwd").is_err());
/// assert!(validate_name("nested/file.png").is_err());
/// assert!(validate_name("a\0b").is_err());
/// assert!(validate_name("").is_err());
/// ```
pub fn validate(name: &str) -> Result<&str> {
    // Null bytes pass through Path::components() on Unix but cause
    // truncation in C-based syscalls; reject them explicitly.
    if name.is_empty() || name.contains('\0') || name.contains('/') || name.contains('\\') {
        exn::bail!(ErrorKind::InvalidName(name.to_string()));
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => exn::bail!(ErrorKind::InvalidName(name.to_string())),
    }
}
