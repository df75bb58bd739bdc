/// Parsers Module
///
/// Contains record parsers for the different IMDb flat files.
/// Each parser turns a positional `SourceRecord` into a typed row, applying the
/// `\N` null mapping and numeric coercion.
pub mod crew;
pub mod person;
pub mod principal;
pub mod rating;
pub mod title;

use crate::error::{LoadError, LoadResult};
use crate::etl::extract::SourceRecord;
use std::path::Path;
use std::str::FromStr;

// Re-export commonly used parsers
pub use crew::parse_crew;
pub use person::parse_person;
pub use principal::parse_principal;
pub use rating::parse_rating;
pub use title::{parse_genre_list, parse_title};

/// Typed access to the fields of one record, reporting failures with file and line
pub struct Fields<'a> {
    path: &'a Path,
    record: &'a SourceRecord,
}

impl<'a> Fields<'a> {
    pub fn new(path: &'a Path, record: &'a SourceRecord) -> Self {
        Self { path, record }
    }

    pub fn text(&self, index: usize) -> &'a str {
        self.record.field(index)
    }

    pub fn optional_text(&self, index: usize) -> Option<&'a str> {
        self.record.optional(index)
    }

    /// A numeric field that must be present and well formed
    pub fn required<T: FromStr>(&self, index: usize, field: &'static str) -> LoadResult<T> {
        let raw = self.text(index);
        raw.trim().parse::<T>().map_err(|_| self.invalid(field, raw))
    }

    /// A numeric field that may be `\N`; any other unparsable value is rejected
    pub fn optional<T: FromStr>(&self, index: usize, field: &'static str) -> LoadResult<Option<T>> {
        match self.optional_text(index) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| self.invalid(field, raw)),
        }
    }

    fn invalid(&self, field: &'static str, raw: &str) -> LoadError {
        LoadError::InvalidField { path: self.path.to_path_buf(), line: self.record.line, field, value: raw.to_string() }
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones
pub fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.into_iter().flat_map(|list| list.split(',')).map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
pub(crate) fn record(line: u64, fields: &[&str]) -> SourceRecord {
    SourceRecord { line, fields: fields.iter().map(|f| f.to_string()).collect() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_and_optional_numbers() {
        let rec = record(3, &["nm1", "1970", "\\N", "abc"]);
        let fields = Fields::new(Path::new("name.basics.tsv"), &rec);

        assert_eq!(fields.required::<i32>(1, "birth_year").unwrap(), 1970);
        assert_eq!(fields.optional::<i32>(2, "death_year").unwrap(), None);
        assert!(fields.required::<i32>(2, "death_year").is_err());

        let err = fields.optional::<i32>(3, "runtime_minutes").unwrap_err();
        match err {
            LoadError::InvalidField { line, field, value, .. } => {
                assert_eq!(line, 3);
                assert_eq!(field, "runtime_minutes");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(Some("Drama, Action,,")).collect::<Vec<_>>(), vec!["Drama", "Action"]);
        assert_eq!(split_list(None).count(), 0);
    }
}
