/// `name.basics.tsv` parser
///
/// Columns: nconst, primaryName, birthYear, deathYear, primaryProfession, knownForTitles
use super::Fields;
use crate::error::LoadResult;
use crate::models::NewPerson;

/// Fields a person line must carry
pub const MIN_FIELDS: usize = 5;

pub fn parse_person(fields: &Fields<'_>) -> LoadResult<NewPerson> {
    Ok(NewPerson {
        imdb_nconst: fields.text(0).to_string(),
        primary_name: fields.text(1).to_string(),
        birth_year: fields.optional(2, "birth_year")?,
        death_year: fields.optional(3, "death_year")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etl::parsers::record;
    use std::path::Path;

    #[test]
    fn test_parse_person_maps_null_years() {
        let rec = record(2, &["nm0000001", "Fred Astaire", "1899", "\\N", "actor,soundtrack", "tt0050419"]);
        let person = parse_person(&Fields::new(Path::new("name.basics.tsv"), &rec)).unwrap();

        assert_eq!(person.imdb_nconst, "nm0000001");
        assert_eq!(person.primary_name, "Fred Astaire");
        assert_eq!(person.birth_year, Some(1899));
        assert_eq!(person.death_year, None);
    }

    #[test]
    fn test_parse_person_rejects_garbage_year() {
        let rec = record(9, &["nm0000002", "Lauren Bacall", "19x4", "2014", "actress"]);
        assert!(parse_person(&Fields::new(Path::new("name.basics.tsv"), &rec)).is_err());
    }
}
