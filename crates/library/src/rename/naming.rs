use bannr_storage::file::extension_of;

/// Interactive renames give up after this many `{base}_{n}` candidates.
pub const MAX_INTERACTIVE_ATTEMPTS: usize = 10;
/// Sequential renames give up after this many `_conflict_{n}` candidates.
pub const MAX_SEQUENTIAL_CONFLICTS: usize = 5;

/// Answer to "the name you picked is taken".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    /// Replace the file currently using the name.
    Overwrite,
    /// Try the next `{base}_{n}{ext}` candidate.
    Retry,
}

/// Supplies names for interactive renames (usually by asking a person).
///
/// Calls may block; they are made one at a time from the task driving the
/// batch.
pub trait NameDecider: Send {
    /// New base name (without extension) for `original`. `None` or a blank
    /// answer keeps the original name.
    fn name_for(&mut self, original: &str) -> Option<String>;

    /// `candidate` is already taken by a file nobody else is tracking.
    fn on_conflict(&mut self, original: &str, candidate: &str) -> ConflictChoice;
}

/// How a batch of new files is named.
pub enum NamingPolicy {
    Interactive(Box<dyn NameDecider>),
    /// `base` followed by the file's 1-based position, zero-padded to the
    /// width of the batch size.
    Sequential { base: String },
}

impl NamingPolicy {
    pub fn sequential(base: impl Into<String>) -> Self {
        Self::Sequential { base: base.into() }
    }

    pub fn interactive(decider: impl NameDecider + 'static) -> Self {
        Self::Interactive(Box::new(decider))
    }
}

impl std::fmt::Debug for NamingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interactive(_) => f.write_str("Interactive"),
            Self::Sequential { base } => f.debug_struct("Sequential").field("base", base).finish(),
        }
    }
}

/// Number of digits in `count`; sequential indexes are padded to this.
pub fn index_width(count: usize) -> usize {
    count.to_string().len()
}

/// `{base}{index:0width}{ext}` where `ext` comes from `source_name`.
pub fn sequential_name(base: &str, index: usize, width: usize, source_name: &str) -> String {
    format!("{base}{index:0width$}{}", extension_of(source_name))
}
