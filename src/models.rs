/// Data Models Module
///
/// This module defines the core data structures used throughout the loader.
/// These models represent IMDb dataset entities (people, titles, genres) and the
/// rows written to the relational store.
use serde::{Deserialize, Serialize};

/// Canonical genre names seeded into `genre_lookup`
pub const GENRES: [&str; 27] = [
    "Action",
    "Adventure",
    "Animation",
    "Biography",
    "Comedy",
    "Crime",
    "Documentary",
    "Drama",
    "Family",
    "Fantasy",
    "Film-Noir",
    "Game-Show",
    "History",
    "Horror",
    "Music",
    "Musical",
    "Mystery",
    "News",
    "Reality-TV",
    "Romance",
    "Sci-Fi",
    "Short",
    "Sport",
    "Talk-Show",
    "Thriller",
    "War",
    "Western",
];

/// Entity kinds that own a natural key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Person,
    Title,
    Genre,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Title => "title",
            Self::Genre => "genre",
        }
    }
}

/// Title categories kept by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TitleCategory {
    Movie,
    Series,
    TvMovie,
    Episode,
    MiniSeries,
}

impl TitleCategory {
    /// Map a `titleType` value from `title.basics.tsv`; anything outside the allow-list is `None`
    pub fn from_source(raw: &str) -> Option<Self> {
        match raw {
            "movie" => Some(Self::Movie),
            "tvSeries" => Some(Self::Series),
            "tvMovie" => Some(Self::TvMovie),
            "tvEpisode" => Some(Self::Episode),
            "tvMiniSeries" => Some(Self::MiniSeries),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "series",
            Self::TvMovie => "tv-movie",
            Self::Episode => "episode",
            Self::MiniSeries => "mini-series",
        }
    }
}

/// Role a person holds on a title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleKind {
    Actor,
    Director,
    Writer,
    Producer,
    Composer,
    Cinematographer,
    Editor,
}

impl RoleKind {
    /// Map a `category` value from `title.principals.tsv`.
    ///
    /// Categories such as `self` or `archive_footage` have no role and return `None`.
    pub fn from_category(category: &str) -> Option<Self> {
        match category {
            "actor" | "actress" => Some(Self::Actor),
            "director" => Some(Self::Director),
            "writer" => Some(Self::Writer),
            "producer" => Some(Self::Producer),
            "composer" => Some(Self::Composer),
            "cinematographer" => Some(Self::Cinematographer),
            "editor" => Some(Self::Editor),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Actor => "actor",
            Self::Director => "director",
            Self::Writer => "writer",
            Self::Producer => "producer",
            Self::Composer => "composer",
            Self::Cinematographer => "cinematographer",
            Self::Editor => "editor",
        }
    }
}

/// A genre row to seed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGenre {
    pub genre_name: String,
}

/// A person row keyed by `imdb_nconst`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPerson {
    pub imdb_nconst: String,
    pub primary_name: String,
    pub birth_year: Option<i32>,
    pub death_year: Option<i32>,
}

/// A title row keyed by `imdb_tconst`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTitle {
    pub imdb_tconst: String,
    pub primary_title: String,
    pub category: TitleCategory,
    pub start_year: Option<i32>,
    pub runtime_minutes: Option<i32>,
    pub is_adult: bool,
}

/// Average rating and vote count for one title, applied by `imdb_tconst`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingUpdate {
    pub imdb_tconst: String,
    pub avg_rating: f64,
    pub num_votes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TitleGenre {
    pub title_id: i64,
    pub genre_id: i64,
}

/// A cast/crew link; `characters` is part of the row identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TitlePersonRole {
    pub title_id: i64,
    pub person_id: i64,
    pub role: RoleKind,
    pub characters: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRating {
    pub user_id: i64,
    pub title_id: i64,
    pub rating_value: i16,
    pub review_text: Option<String>,
}

/// Ordering of a synthetic-rating tier query; ties always fall back to `title_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierOrder {
    /// avg_rating DESC, num_votes DESC
    Rating,
    /// start_year DESC, avg_rating DESC
    Recency,
}

/// One popularity tier of already-loaded titles
#[derive(Debug, Clone, PartialEq)]
pub struct RatingTier {
    pub min_rating: f64,
    pub min_votes: i64,
    pub min_start_year: Option<i32>,
    pub order: TierOrder,
    pub limit: usize,
}

/// Aggregate statistics over `user_rating`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRatingStats {
    pub total: i64,
    pub average: f64,
    pub min: i16,
    pub max: i16,
}
