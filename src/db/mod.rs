/// Database Module
///
/// This module defines the relational sink the loader writes to:
/// - The `Store` trait consumed by the loading stages
/// - `Batch`, one bulk write against a single table
/// - A PostgreSQL implementation (`Database`) and an in-memory one (`MemoryStore`)
mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::Database;

use crate::models::{
    EntityKind, NewGenre, NewPerson, NewTitle, RatingTier, RatingUpdate, TitleGenre, TitlePersonRole, UserRating,
    UserRatingStats,
};
use anyhow::Result;
use async_trait::async_trait;

/// Bind parameters PostgreSQL accepts in one statement
pub const MAX_BIND_PARAMS: usize = u16::MAX as usize;

/// Largest batch whose widest row type (titles, 6 binds) still fits one statement
pub const MAX_BATCH_SIZE: usize = MAX_BIND_PARAMS / 6;

/// Tables owned by the loader, in load order
pub const TABLES: [&str; 6] = ["genre_lookup", "person", "title", "title_genre", "title_person_role", "user_rating"];

/// One bulk write. Inserts ignore rows whose natural key already exists;
/// `Ratings` updates titles by `imdb_tconst`.
#[derive(Debug, Clone, PartialEq)]
pub enum Batch {
    Genres(Vec<NewGenre>),
    People(Vec<NewPerson>),
    Titles(Vec<NewTitle>),
    Ratings(Vec<RatingUpdate>),
    TitleGenres(Vec<TitleGenre>),
    Roles(Vec<TitlePersonRole>),
    UserRatings(Vec<UserRating>),
}

impl Batch {
    pub fn len(&self) -> usize {
        match self {
            Self::Genres(rows) => rows.len(),
            Self::People(rows) => rows.len(),
            Self::Titles(rows) => rows.len(),
            Self::Ratings(rows) => rows.len(),
            Self::TitleGenres(rows) => rows.len(),
            Self::Roles(rows) => rows.len(),
            Self::UserRatings(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bind parameters the bulk statement for this batch needs
    pub fn bind_count(&self) -> usize {
        let per_row = match self {
            Self::Genres(_) => 1,
            Self::People(_) | Self::Roles(_) | Self::UserRatings(_) => 4,
            Self::Titles(_) => 6,
            Self::TitleGenres(_) => 2,
            // Three arrays regardless of length
            Self::Ratings(_) => return 3,
        };
        per_row * self.len()
    }

    /// Target table of the write
    pub fn table(&self) -> &'static str {
        match self {
            Self::Genres(_) => "genre_lookup",
            Self::People(_) => "person",
            Self::Titles(_) | Self::Ratings(_) => "title",
            Self::TitleGenres(_) => "title_genre",
            Self::Roles(_) => "title_person_role",
            Self::UserRatings(_) => "user_rating",
        }
    }
}

/// A row type that can be buffered and written as a `Batch`
pub trait BatchRow: Send + Sized {
    fn into_batch(rows: Vec<Self>) -> Batch;
}

macro_rules! batch_row {
    ($($row:ty => $variant:ident),* $(,)?) => {
        $(impl BatchRow for $row {
            fn into_batch(rows: Vec<Self>) -> Batch {
                Batch::$variant(rows)
            }
        })*
    };
}

batch_row! {
    NewGenre => Genres,
    NewPerson => People,
    NewTitle => Titles,
    RatingUpdate => Ratings,
    TitleGenre => TitleGenres,
    TitlePersonRole => Roles,
    UserRating => UserRatings,
}

/// Relational store the loader writes into
#[async_trait]
pub trait Store: Send + Sync {
    /// Apply one batch atomically, returning the rows actually inserted or updated.
    ///
    /// An error means nothing from the batch was kept.
    async fn write_batch(&self, batch: &Batch) -> Result<u64>;

    /// Every `(natural key, surrogate key)` pair stored for `kind`
    async fn natural_keys(&self, kind: EntityKind) -> Result<Vec<(String, i64)>>;

    /// Surrogate keys of the titles in one synthetic-rating tier, in tier order
    async fn tier_titles(&self, tier: &RatingTier) -> Result<Vec<i64>>;

    /// Row count of one of the `TABLES`
    async fn count_rows(&self, table: &str) -> Result<i64>;

    /// `(title_type, count)` sorted by count descending
    async fn titles_by_category(&self) -> Result<Vec<(String, i64)>>;

    /// `(role_type, count)` sorted by count descending
    async fn roles_by_kind(&self) -> Result<Vec<(String, i64)>>;

    /// `None` when no user ratings exist
    async fn user_rating_stats(&self) -> Result<Option<UserRatingStats>>;
}
