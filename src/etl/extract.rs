/// Extract Module
///
/// Streams tab-separated records out of the IMDb flat files. The header line is
/// always discarded and lines with too few fields are skipped, so a stage only
/// ever sees records it can index positionally.
use crate::error::{LoadError, LoadResult};
use csv::{ByteRecord, ReaderBuilder};
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};

/// Value the dataset uses for "no value"
pub const NULL_SENTINEL: &str = "\\N";

/// One data line of a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    /// 1-based line number in the file (the header is line 1)
    pub line: u64,
    pub fields: Vec<String>,
}

impl SourceRecord {
    /// Field at `index`, or the empty string past the end of a short record
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }

    /// Field at `index` with the null sentinel mapped to `None`
    pub fn optional(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str).filter(|v| *v != NULL_SENTINEL)
    }
}

/// Lazy, non-restartable reader over one flat file
pub struct RecordSource {
    path: PathBuf,
    reader: csv::Reader<BufReader<File>>,
    buffer: ByteRecord,
    min_fields: usize,
    scanned: u64,
    skipped: u64,
    exhausted: bool,
    failure: Option<std::io::Error>,
}

impl RecordSource {
    /// Open `path`, yielding only records with at least `min_fields` fields
    pub fn open(path: impl AsRef<Path>, min_fields: usize) -> LoadResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => LoadError::SourceNotFound { path: path.clone() },
            _ => LoadError::SourceIo { path: path.clone(), source },
        })?;

        // IMDb exports never quote: a stray `"` is part of the value
        let reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .quoting(false)
            .trim(csv::Trim::None)
            .from_reader(BufReader::with_capacity(1 << 20, file));

        Ok(Self { path, reader, buffer: ByteRecord::new(), min_fields, scanned: 0, skipped: 0, exhausted: false, failure: None })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data lines read so far, skipped ones included
    pub fn scanned(&self) -> u64 {
        self.scanned
    }

    /// Data lines dropped for having too few fields or being unreadable
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Surface the I/O error that ended iteration early, if there was one
    pub fn finish(&mut self) -> LoadResult<()> {
        match self.failure.take() {
            Some(source) => Err(LoadError::SourceIo { path: self.path.clone(), source }),
            None => Ok(()),
        }
    }
}

impl Iterator for RecordSource {
    type Item = SourceRecord;

    fn next(&mut self) -> Option<SourceRecord> {
        while !self.exhausted {
            match self.reader.read_byte_record(&mut self.buffer) {
                Ok(false) => self.exhausted = true,
                Ok(true) => {
                    self.scanned += 1;
                    let line = self.buffer.position().map(|p| p.line()).unwrap_or(self.scanned + 1);

                    if self.buffer.len() < self.min_fields {
                        self.skipped += 1;
                        tracing::debug!(
                            "Skipping {}:{} ({} fields, need {})",
                            self.path.display(),
                            line,
                            self.buffer.len(),
                            self.min_fields
                        );
                        continue;
                    }

                    let fields = self.buffer.iter().map(|f| String::from_utf8_lossy(f).into_owned()).collect();
                    return Some(SourceRecord { line, fields });
                }
                Err(e) if e.is_io_error() => {
                    tracing::warn!("Stopped reading {} after {} lines: {}", self.path.display(), self.scanned, e);
                    self.exhausted = true;
                    if let csv::ErrorKind::Io(source) = e.into_kind() {
                        self.failure = Some(source);
                    }
                }
                Err(e) => {
                    self.scanned += 1;
                    self.skipped += 1;
                    tracing::debug!("Skipping malformed line in {}: {}", self.path.display(), e);
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn test_header_is_skipped_and_short_lines_dropped() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "title.ratings.tsv",
            b"tconst\taverageRating\tnumVotes\ntt0000001\t5.7\t2096\ntt0000002\t5.6\ntt0000003\t6.5\t2110\n",
        );

        let mut source = RecordSource::open(&path, 3).unwrap();
        let records: Vec<_> = source.by_ref().collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields, vec!["tt0000001", "5.7", "2096"]);
        assert_eq!(records[0].line, 2);
        assert_eq!(records[1].field(0), "tt0000003");
        assert_eq!(records[1].line, 4);
        assert_eq!(source.scanned(), 3);
        assert_eq!(source.skipped(), 1);
    }

    #[test]
    fn test_header_only_file_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "title.crew.tsv", b"tconst\tdirectors\twriters\n");

        assert_eq!(RecordSource::open(&path, 3).unwrap().count(), 0);
    }

    #[test]
    fn test_null_sentinel_and_quotes_are_preserved_as_text() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "title.principals.tsv",
            b"tconst\tordering\tnconst\tcategory\tjob\tcharacters\ntt0000001\t1\tnm0000001\tactor\t\\N\t[\"Self\"]\n",
        );

        let record = RecordSource::open(&path, 4).unwrap().next().unwrap();
        assert_eq!(record.field(4), NULL_SENTINEL);
        assert_eq!(record.optional(4), None);
        assert_eq!(record.optional(5), Some("[\"Self\"]"));
        assert_eq!(record.optional(9), None);
    }

    #[test]
    fn test_invalid_utf8_is_replaced_not_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "name.basics.tsv", b"nconst\tprimaryName\nnm1\tBj\xF6rk\nnm2\tPlain\n");

        let records: Vec<_> = RecordSource::open(&path, 2).unwrap().collect();
        assert_eq!(records.len(), 2);
        assert!(records[0].field(1).starts_with("Bj"));
        assert_eq!(records[1].field(1), "Plain");
    }

    #[test]
    fn test_missing_file_is_reported_as_not_found() {
        let dir = TempDir::new().unwrap();
        let err = RecordSource::open(dir.path().join("absent.tsv"), 1).err().unwrap();
        assert!(matches!(err, LoadError::SourceNotFound { .. }));
    }
}
