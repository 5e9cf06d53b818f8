use crate::error::{ErrorKind, Result};
use crate::timestamp;

/// Column labels of a well-formed ledger, in order.
pub const HEADER: [&str; 4] = ["Timestamp", "Original", "Renamed", "URL"];

/// One processed file.
///
/// `original` is the deduplication key. An empty `url` means the file has
/// not been uploaded (or the upload failed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    pub timestamp: String,
    pub original: String,
    pub renamed: String,
    pub url: String,
}

impl LedgerRow {
    /// A row stamped with the current local time.
    pub fn new(original: impl Into<String>, renamed: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp::now(),
            original: original.into(),
            renamed: renamed.into(),
            url: url.into(),
        }
    }

    pub fn has_url(&self) -> bool {
        !self.url.is_empty()
    }

    /// Refresh the timestamp after an in-place change.
    pub fn touch(&mut self) {
        self.timestamp = timestamp::now();
    }

    pub(crate) fn as_record(&self) -> [&str; 4] {
        [&self.timestamp, &self.original, &self.renamed, &self.url]
    }

    pub(crate) fn from_record(record: &csv::StringRecord) -> Option<Self> {
        if record.len() != HEADER.len() {
            return None;
        }
        Some(Self {
            timestamp: record[0].to_string(),
            original: record[1].to_string(),
            renamed: record[2].to_string(),
            url: record[3].to_string(),
        })
    }
}

/// Full contents of the ledger as read by [`Ledger::read_all()`](crate::Ledger::read_all).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTable {
    /// Header labels as found in the file.
    pub columns: Vec<String>,
    /// Rows whose column count matched the header.
    pub rows: Vec<LedgerRow>,
    /// Number of rows dropped because their column count did not match.
    pub malformed: usize,
}

impl Default for LedgerTable {
    fn default() -> Self {
        Self {
            columns: HEADER.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
            malformed: 0,
        }
    }
}

impl LedgerTable {
    pub fn has_standard_header(&self) -> bool {
        self.columns.iter().map(String::as_str).eq(HEADER)
    }

    /// Refuse to work with a ledger whose columns are not the standard ones;
    /// rewriting it would otherwise mislabel every column.
    pub fn ensure_standard_header(&self) -> Result<()> {
        if !self.has_standard_header() {
            exn::bail!(ErrorKind::Header(self.columns.join(",")));
        }
        Ok(())
    }

    pub fn find(&self, original: &str) -> Option<&LedgerRow> {
        self.rows.iter().find(|row| row.original == original)
    }

    pub fn find_mut(&mut self, original: &str) -> Option<&mut LedgerRow> {
        self.rows.iter_mut().find(|row| row.original == original)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn table(columns: &[&str]) -> LedgerTable {
        LedgerTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ..LedgerTable::default()
        }
    }

    #[rstest]
    #[case(&["Timestamp", "Original", "Renamed", "URL"], true)]
    #[case(&["Timestamp", "Original", "Renamed"], false)]
    #[case(&["timestamp", "original", "renamed", "url"], false)]
    #[case(&["Original", "Timestamp", "Renamed", "URL"], false)]
    #[case(&["Timestamp", "Original", "Renamed", "URL", "Extra"], false)]
    fn test_standard_header(#[case] columns: &[&str], #[case] standard: bool) {
        let table = table(columns);
        assert_eq!(table.has_standard_header(), standard);
        assert_eq!(table.ensure_standard_header().is_ok(), standard);
    }

    #[test]
    fn test_default_is_standard_and_empty() {
        let table = LedgerTable::default();
        assert!(table.has_standard_header());
        assert!(table.is_empty());
    }

    #[test]
    fn test_find() {
        let mut table = LedgerTable::default();
        table.rows.push(LedgerRow::new("a.jpg", "T1.jpg", ""));
        table.rows.push(LedgerRow::new("b.jpg", "T2.jpg", "https://example.com/b"));
        assert_eq!(table.find("b.jpg").map(|r| r.renamed.as_str()), Some("T2.jpg"));
        assert!(table.find("c.jpg").is_none());
        table.find_mut("a.jpg").unwrap().url = "https://example.com/a".to_string();
        assert!(table.rows.iter().all(LedgerRow::has_url));
    }
}
