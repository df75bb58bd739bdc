/// `title.ratings.tsv` parser
///
/// Columns: tconst, averageRating, numVotes. Both numbers are required.
use super::Fields;
use crate::error::LoadResult;
use crate::models::RatingUpdate;

pub const MIN_FIELDS: usize = 3;

pub fn parse_rating(fields: &Fields<'_>) -> LoadResult<RatingUpdate> {
    Ok(RatingUpdate {
        imdb_tconst: fields.text(0).to_string(),
        avg_rating: fields.required(1, "average_rating")?,
        num_votes: fields.required(2, "num_votes")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::etl::parsers::record;
    use std::path::Path;

    #[test]
    fn test_parse_rating() {
        let rec = record(2, &["tt0000001", "5.7", "2096"]);
        let rating = parse_rating(&Fields::new(Path::new("title.ratings.tsv"), &rec)).unwrap();
        assert_eq!(rating.imdb_tconst, "tt0000001");
        assert!((rating.avg_rating - 5.7).abs() < f64::EPSILON);
        assert_eq!(rating.num_votes, 2096);
    }

    #[test]
    fn test_null_vote_count_is_fatal() {
        let rec = record(4, &["tt0000001", "5.7", "\\N"]);
        let err = parse_rating(&Fields::new(Path::new("title.ratings.tsv"), &rec)).unwrap_err();
        assert!(matches!(err, LoadError::InvalidField { field: "num_votes", line: 4, .. }));
    }
}
