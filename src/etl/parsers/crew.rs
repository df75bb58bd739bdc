/// `title.crew.tsv` parser
///
/// Columns: tconst, directors, writers. Both lists are comma-separated nconsts.
use super::{split_list, Fields};

pub const MIN_FIELDS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrewRecord<'a> {
    pub tconst: &'a str,
    pub directors: Vec<&'a str>,
    pub writers: Vec<&'a str>,
}

pub fn parse_crew<'a>(fields: &Fields<'a>) -> CrewRecord<'a> {
    CrewRecord {
        tconst: fields.text(0),
        directors: split_list(fields.optional_text(1)).collect(),
        writers: split_list(fields.optional_text(2)).collect(),
    }
}
