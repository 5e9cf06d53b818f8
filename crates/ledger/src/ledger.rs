use crate::error::{ErrorKind, Result};
use crate::row::{HEADER, LedgerRow, LedgerTable};
use exn::ResultExt;
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::instrument;

/// Handle to the CSV ledger file.
///
/// The ledger is not cached: every call goes back to disk, so the file is
/// always the source of truth.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw file contents, or `None` if the ledger does not exist yet.
    async fn contents(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).or_raise(|| ErrorKind::Read(self.path.clone())),
        }
    }

    fn reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new().has_headers(false).flexible(true).from_reader(bytes)
    }

    /// Every `Original` value in the ledger.
    ///
    /// A missing file is an empty set. A file that exists but cannot be
    /// parsed (or has no `Original` column) is a [`Read`](ErrorKind::Read)
    /// error.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub async fn known_originals(&self) -> Result<HashSet<String>> {
        let Some(bytes) = self.contents().await? else {
            return Ok(HashSet::new());
        };
        let mut records = Self::reader(&bytes).into_records();
        let header = match records.next() {
            None => return Ok(HashSet::new()),
            Some(header) => header.or_raise(|| ErrorKind::Read(self.path.clone()))?,
        };
        let Some(column) = header.iter().position(|label| label == HEADER[1]) else {
            exn::bail!(ErrorKind::Read(self.path.clone()));
        };
        let mut known = HashSet::new();
        for record in records {
            let record = record.or_raise(|| ErrorKind::Read(self.path.clone()))?;
            if let Some(original) = record.get(column) {
                known.insert(original.to_string());
            }
        }
        tracing::debug!(count = known.len(), "loaded known originals");
        Ok(known)
    }

    /// Header labels and every well-formed row.
    ///
    /// Rows whose column count does not match the header are dropped and
    /// counted in [`LedgerTable::malformed`]. A missing or empty file yields
    /// an empty table with the standard header.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub async fn read_all(&self) -> Result<LedgerTable> {
        let Some(bytes) = self.contents().await? else {
            return Ok(LedgerTable::default());
        };
        let mut records = Self::reader(&bytes).into_records();
        let columns: Vec<String> = match records.next() {
            None => return Ok(LedgerTable::default()),
            Some(header) => header.or_raise(|| ErrorKind::Read(self.path.clone()))?.iter().map(str::to_string).collect(),
        };
        let mut table = LedgerTable {
            columns,
            rows: Vec::new(),
            malformed: 0,
        };
        for (index, record) in records.enumerate() {
            let record = record.or_raise(|| ErrorKind::Read(self.path.clone()))?;
            let row = (record.len() == table.columns.len()).then(|| LedgerRow::from_record(&record)).flatten();
            match row {
                Some(row) => table.rows.push(row),
                None => {
                    // Line numbers are 1-based and the header is line 1.
                    tracing::warn!(line = index + 2, columns = record.len(), "skipping malformed ledger row");
                    table.malformed += 1;
                },
            }
        }
        Ok(table)
    }

    /// Append rows, writing the header first if the ledger is absent or
    /// empty. All rows are written in a single operation.
    #[instrument(skip_all, fields(path = %self.path.display(), rows = rows.len()))]
    pub async fn append(&self, rows: &[LedgerRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let needs_header = match fs::metadata(&self.path).await {
            Ok(metadata) => metadata.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(e).or_raise(|| ErrorKind::Write(self.path.clone())),
        };
        let header = needs_header.then_some(HEADER.as_slice());
        let buffer = self.serialize(header, rows)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .or_raise(|| ErrorKind::Write(self.path.clone()))?;
        file.write_all(&buffer).await.or_raise(|| ErrorKind::Write(self.path.clone()))?;
        file.flush().await.or_raise(|| ErrorKind::Write(self.path.clone()))?;
        tracing::debug!(header = needs_header, "appended ledger rows");
        Ok(())
    }

    /// Replace the whole ledger with `columns` followed by `rows`.
    ///
    /// The new contents are written to a sibling temporary file which is
    /// then renamed over the ledger, so a failed write leaves the previous
    /// contents intact.
    #[instrument(skip_all, fields(path = %self.path.display(), rows = rows.len()))]
    pub async fn rewrite_all<S: AsRef<str>>(&self, columns: &[S], rows: &[LedgerRow]) -> Result<()> {
        let columns: Vec<&str> = columns.iter().map(AsRef::as_ref).collect();
        let buffer = self.serialize(Some(columns.as_slice()), rows)?;
        let temporary = self.temporary_path();
        if let Err(e) = fs::write(&temporary, &buffer).await {
            let _ = fs::remove_file(&temporary).await;
            return Err(e).or_raise(|| ErrorKind::Write(self.path.clone()));
        }
        if let Err(e) = fs::rename(&temporary, &self.path).await {
            let _ = fs::remove_file(&temporary).await;
            return Err(e).or_raise(|| ErrorKind::Write(self.path.clone()));
        }
        tracing::debug!("rewrote ledger");
        Ok(())
    }

    fn serialize(&self, header: Option<&[&str]>, rows: &[LedgerRow]) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(Vec::new());
        if let Some(header) = header {
            writer.write_record(header).or_raise(|| ErrorKind::Write(self.path.clone()))?;
        }
        for row in rows {
            writer.write_record(row.as_record()).or_raise(|| ErrorKind::Write(self.path.clone()))?;
        }
        writer.into_inner().map_err(|e| e.into_error()).or_raise(|| ErrorKind::Write(self.path.clone()))
    }

    fn temporary_path(&self) -> PathBuf {
        let mut name = OsString::from(".");
        name.push(self.path.file_name().unwrap_or_else(|| OsStr::new("ledger")));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> (tempfile::TempDir, Ledger) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("index.csv"));
        (dir, ledger)
    }

    fn row(ts: &str, original: &str, renamed: &str, url: &str) -> LedgerRow {
        LedgerRow {
            timestamp: ts.to_string(),
            original: original.to_string(),
            renamed: renamed.to_string(),
            url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let (_dir, ledger) = ledger();
        assert!(ledger.known_originals().await.unwrap().is_empty());
        let table = ledger.read_all().await.unwrap();
        assert!(table.is_empty());
        assert!(table.has_standard_header());
    }

    #[tokio::test]
    async fn test_empty_file_is_empty() {
        let (_dir, ledger) = ledger();
        std::fs::write(ledger.path(), b"").unwrap();
        assert!(ledger.known_originals().await.unwrap().is_empty());
        assert_eq!(ledger.read_all().await.unwrap(), LedgerTable::default());
    }

    #[tokio::test]
    async fn test_append_writes_header_once() {
        let (_dir, ledger) = ledger();
        ledger.append(&[row("t0", "a.jpg", "T1.jpg", "")]).await.unwrap();
        ledger.append(&[row("t1", "b.jpg", "T2.jpg", "https://s-ul.eu/x")]).await.unwrap();
        let contents = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(contents, "Timestamp,Original,Renamed,URL\nt0,a.jpg,T1.jpg,\nt1,b.jpg,T2.jpg,https://s-ul.eu/x\n");
    }

    #[tokio::test]
    async fn test_append_empty_is_noop() {
        let (_dir, ledger) = ledger();
        ledger.append(&[]).await.unwrap();
        assert!(!ledger.path().exists());
    }

    #[tokio::test]
    async fn test_append_to_empty_file_writes_header() {
        let (_dir, ledger) = ledger();
        std::fs::write(ledger.path(), b"").unwrap();
        ledger.append(&[row("t0", "a.jpg", "a.jpg", "")]).await.unwrap();
        let contents = std::fs::read_to_string(ledger.path()).unwrap();
        assert!(contents.starts_with("Timestamp,Original,Renamed,URL\n"));
    }

    #[tokio::test]
    async fn test_known_originals() {
        let (_dir, ledger) = ledger();
        ledger.append(&[row("t0", "a.jpg", "a.jpg", ""), row("t0", "b.jpg", "X.jpg", "u")]).await.unwrap();
        let known = ledger.known_originals().await.unwrap();
        assert_eq!(known, HashSet::from(["a.jpg".to_string(), "b.jpg".to_string()]));
    }

    #[tokio::test]
    async fn test_known_originals_uses_header_position() {
        let (_dir, ledger) = ledger();
        std::fs::write(ledger.path(), "Original,Timestamp\nfirst.png,t0\nsecond.png,t1\n").unwrap();
        let known = ledger.known_originals().await.unwrap();
        assert!(known.contains("first.png"));
        assert!(known.contains("second.png"));
    }

    #[tokio::test]
    async fn test_known_originals_without_column_is_read_error() {
        let (_dir, ledger) = ledger();
        std::fs::write(ledger.path(), "Something,Else\n1,2\n").unwrap();
        let err = ledger.known_originals().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Read(_)));
    }

    #[tokio::test]
    async fn test_unparsable_is_read_error() {
        let (_dir, ledger) = ledger();
        std::fs::write(ledger.path(), b"Timestamp,Original,Renamed,URL\n\xff\xfe,\xff,x,\n").unwrap();
        let err = ledger.read_all().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Read(_)));
    }

    #[tokio::test]
    async fn test_read_all_drops_malformed_rows() {
        let (_dir, ledger) = ledger();
        std::fs::write(
            ledger.path(),
            "Timestamp,Original,Renamed,URL\nt0,a.jpg,T1.jpg,\nbroken,row\nt1,b.jpg,T2.jpg,u,extra\nt2,c.jpg,T3.jpg,u\n",
        )
        .unwrap();
        let table = ledger.read_all().await.unwrap();
        assert_eq!(table.malformed, 2);
        assert_eq!(table.rows, vec![row("t0", "a.jpg", "T1.jpg", ""), row("t2", "c.jpg", "T3.jpg", "u")]);
    }

    #[tokio::test]
    async fn test_read_all_keeps_duplicates() {
        let (_dir, ledger) = ledger();
        ledger.append(&[row("t0", "a.jpg", "a.jpg", ""), row("t1", "a.jpg", "b.jpg", "")]).await.unwrap();
        assert_eq!(ledger.read_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_quoted_fields_survive() {
        let (_dir, ledger) = ledger();
        let tricky = row("t0", "with, comma.png", "with \"quotes\".png", "");
        ledger.append(std::slice::from_ref(&tricky)).await.unwrap();
        assert_eq!(ledger.read_all().await.unwrap().rows, vec![tricky]);
    }

    #[tokio::test]
    async fn test_rewrite_all_header_only() {
        let (_dir, ledger) = ledger();
        ledger.append(&[row("t0", "a.jpg", "a.jpg", "")]).await.unwrap();
        ledger.rewrite_all(&HEADER[..], &[]).await.unwrap();
        assert_eq!(std::fs::read_to_string(ledger.path()).unwrap(), "Timestamp,Original,Renamed,URL\n");
        assert!(!ledger.temporary_path().exists());
    }

    #[tokio::test]
    async fn test_rewrite_all_replaces_rows() {
        let (_dir, ledger) = ledger();
        ledger.append(&[row("t0", "a.jpg", "a.jpg", ""), row("t0", "b.jpg", "b.jpg", "")]).await.unwrap();
        let mut table = ledger.read_all().await.unwrap();
        table.rows.retain(|r| r.original != "a.jpg");
        table.rows[0].url = "https://s-ul.eu/b".to_string();
        ledger.rewrite_all(table.columns.as_slice(), &table.rows).await.unwrap();
        let reread = ledger.read_all().await.unwrap();
        assert_eq!(reread.rows, vec![row("t0", "b.jpg", "b.jpg", "https://s-ul.eu/b")]);
    }

    #[tokio::test]
    async fn test_rewrite_failure_leaves_ledger_intact() {
        let (dir, ledger) = ledger();
        ledger.append(&[row("t0", "a.jpg", "a.jpg", "")]).await.unwrap();
        // A directory squatting on the temporary name makes the write fail.
        std::fs::create_dir(dir.path().join(".index.csv.tmp")).unwrap();
        let err = ledger.rewrite_all(&HEADER[..], &[]).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Write(_)));
        assert_eq!(ledger.read_all().await.unwrap().len(), 1);
    }
}
