/// `title.basics.tsv` parser
///
/// Columns: tconst, titleType, primaryTitle, originalTitle, isAdult, startYear,
/// endYear, runtimeMinutes, genres
use super::{split_list, Fields};
use crate::error::LoadResult;
use crate::models::{NewTitle, TitleCategory};

pub const MIN_FIELDS: usize = 9;

/// Parse a title line; titles outside the category allow-list yield `None`
pub fn parse_title(fields: &Fields<'_>) -> LoadResult<Option<NewTitle>> {
    let Some(category) = TitleCategory::from_source(fields.text(1)) else {
        return Ok(None);
    };

    let is_adult: u8 = fields.required(4, "is_adult")?;

    Ok(Some(NewTitle {
        imdb_tconst: fields.text(0).to_string(),
        primary_title: fields.text(2).to_string(),
        category,
        start_year: fields.optional(5, "start_year")?,
        runtime_minutes: fields.optional(7, "runtime_minutes")?,
        is_adult: is_adult != 0,
    }))
}

/// The title's external id and its genre tokens
pub fn parse_genre_list<'a>(fields: &Fields<'a>) -> (&'a str, Vec<&'a str>) {
    (fields.text(0), split_list(fields.optional_text(8)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etl::parsers::record;
    use std::path::Path;

    const EXAMPLE: [&str; 9] = ["tt0000001", "movie", "Example", "0", "0", "1995", "\\N", "90", "Drama,Action"];

    #[test]
    fn test_parse_title_example_line() {
        let rec = record(2, &EXAMPLE);
        let title = parse_title(&Fields::new(Path::new("title.basics.tsv"), &rec)).unwrap().unwrap();

        assert_eq!(title.imdb_tconst, "tt0000001");
        assert_eq!(title.primary_title, "Example");
        assert_eq!(title.category, TitleCategory::Movie);
        assert_eq!(title.start_year, Some(1995));
        assert_eq!(title.runtime_minutes, Some(90));
        assert!(!title.is_adult);
    }

    #[test]
    fn test_parse_title_filters_categories() {
        let mut fields = EXAMPLE;
        fields[1] = "short";
        fields[4] = "not-a-number";
        let rec = record(3, &fields);
        assert_eq!(parse_title(&Fields::new(Path::new("title.basics.tsv"), &rec)).unwrap(), None);
    }

    #[test]
    fn test_parse_title_requires_adult_flag() {
        let mut fields = EXAMPLE;
        fields[4] = "\\N";
        let rec = record(3, &fields);
        assert!(parse_title(&Fields::new(Path::new("title.basics.tsv"), &rec)).is_err());
    }

    #[test]
    fn test_parse_genre_list() {
        let rec = record(2, &EXAMPLE);
        let fields = Fields::new(Path::new("title.basics.tsv"), &rec);
        assert_eq!(parse_genre_list(&fields), ("tt0000001", vec!["Drama", "Action"]));

        let mut no_genres = EXAMPLE;
        no_genres[8] = "\\N";
        let rec = record(3, &no_genres);
        assert!(parse_genre_list(&Fields::new(Path::new("title.basics.tsv"), &rec)).1.is_empty());
    }
}
