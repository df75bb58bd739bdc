/// In-memory Store
///
/// Mirrors the PostgreSQL schema's natural keys and foreign keys so a dry run
/// behaves like a real load: duplicate natural keys are ignored, and a batch
/// referencing a missing row is rejected as a whole.
use super::{Batch, Store, TABLES};
use crate::models::{
    EntityKind, NewPerson, NewTitle, RatingTier, TierOrder, TitlePersonRole, UserRating, UserRatingStats,
};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct StoredTitle {
    title_id: i64,
    row: NewTitle,
    avg_rating: Option<f64>,
    num_votes: Option<i64>,
}

#[derive(Debug, Default)]
struct Tables {
    genres: Vec<(i64, String)>,
    genre_index: HashMap<String, i64>,
    people: Vec<(i64, NewPerson)>,
    person_index: HashMap<String, i64>,
    titles: Vec<StoredTitle>,
    title_index: HashMap<String, usize>,
    title_genres: BTreeSet<(i64, i64)>,
    roles: Vec<TitlePersonRole>,
    role_keys: HashSet<(i64, i64, &'static str, String)>,
    user_ratings: Vec<UserRating>,
    user_rating_keys: HashSet<(i64, i64)>,
    failing_tables: HashSet<String>,
}

impl Tables {
    fn has_title(&self, title_id: i64) -> bool {
        title_id >= 1 && title_id as usize <= self.titles.len()
    }

    fn has_person(&self, person_id: i64) -> bool {
        person_id >= 1 && person_id as usize <= self.people.len()
    }

    fn has_genre(&self, genre_id: i64) -> bool {
        genre_id >= 1 && genre_id as usize <= self.genres.len()
    }

    fn apply(&mut self, batch: &Batch) -> Result<u64> {
        if self.failing_tables.contains(batch.table()) {
            bail!("injected write failure on {}", batch.table());
        }

        // Foreign keys are checked up front so a rejected batch leaves nothing behind
        match batch {
            Batch::TitleGenres(rows) => {
                if let Some(bad) = rows.iter().find(|r| !self.has_title(r.title_id) || !self.has_genre(r.genre_id)) {
                    bail!("title_genre references missing row: {:?}", bad);
                }
            }
            Batch::Roles(rows) => {
                if let Some(bad) = rows.iter().find(|r| !self.has_title(r.title_id) || !self.has_person(r.person_id)) {
                    bail!("title_person_role references missing row: {:?}", bad);
                }
                if let Some(bad) = rows.iter().find(|r| r.characters.as_deref() == Some("")) {
                    bail!("empty character text must be stored as NULL: {:?}", bad);
                }
            }
            Batch::UserRatings(rows) => {
                if let Some(bad) = rows.iter().find(|r| !self.has_title(r.title_id) || !(1..=10).contains(&r.rating_value)) {
                    bail!("invalid user_rating row: {:?}", bad);
                }
            }
            _ => {}
        }

        let mut affected = 0u64;
        match batch {
            Batch::Genres(rows) => {
                for row in rows {
                    if !self.genre_index.contains_key(&row.genre_name) {
                        let id = self.genres.len() as i64 + 1;
                        self.genres.push((id, row.genre_name.clone()));
                        self.genre_index.insert(row.genre_name.clone(), id);
                        affected += 1;
                    }
                }
            }
            Batch::People(rows) => {
                for row in rows {
                    if !self.person_index.contains_key(&row.imdb_nconst) {
                        let id = self.people.len() as i64 + 1;
                        self.people.push((id, row.clone()));
                        self.person_index.insert(row.imdb_nconst.clone(), id);
                        affected += 1;
                    }
                }
            }
            Batch::Titles(rows) => {
                for row in rows {
                    if !self.title_index.contains_key(&row.imdb_tconst) {
                        let title_id = self.titles.len() as i64 + 1;
                        self.title_index.insert(row.imdb_tconst.clone(), self.titles.len());
                        self.titles.push(StoredTitle { title_id, row: row.clone(), avg_rating: None, num_votes: None });
                        affected += 1;
                    }
                }
            }
            Batch::Ratings(rows) => {
                for row in rows {
                    if let Some(&pos) = self.title_index.get(&row.imdb_tconst) {
                        let title = &mut self.titles[pos];
                        title.avg_rating = Some(row.avg_rating);
                        title.num_votes = Some(row.num_votes);
                        affected += 1;
                    }
                }
            }
            Batch::TitleGenres(rows) => {
                for row in rows {
                    if self.title_genres.insert((row.title_id, row.genre_id)) {
                        affected += 1;
                    }
                }
            }
            Batch::Roles(rows) => {
                for row in rows {
                    let key = (row.title_id, row.person_id, row.role.as_str(), row.characters.clone().unwrap_or_default());
                    if self.role_keys.insert(key) {
                        self.roles.push(row.clone());
                        affected += 1;
                    }
                }
            }
            Batch::UserRatings(rows) => {
                for row in rows {
                    if self.user_rating_keys.insert((row.user_id, row.title_id)) {
                        self.user_ratings.push(row.clone());
                        affected += 1;
                    }
                }
            }
        }

        Ok(affected)
    }
}

fn sorted_counts(counts: BTreeMap<String, i64>) -> Vec<(String, i64)> {
    let mut counts: Vec<(String, i64)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

fn desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// `Store` backed by process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| anyhow!("memory store lock poisoned"))
    }

    /// Make every later write to `table` fail, as a broken connection would
    #[cfg(test)]
    pub fn fail_writes_to(&self, table: &str) {
        self.tables().unwrap().failing_tables.insert(table.to_string());
    }

    #[cfg(test)]
    pub fn restore_writes(&self) {
        self.tables().unwrap().failing_tables.clear();
    }

    #[cfg(test)]
    pub fn roles(&self) -> Vec<TitlePersonRole> {
        self.tables().unwrap().roles.clone()
    }

    #[cfg(test)]
    pub fn title_genres(&self) -> Vec<crate::models::TitleGenre> {
        let tables = self.tables().unwrap();
        tables.title_genres.iter().map(|&(title_id, genre_id)| crate::models::TitleGenre { title_id, genre_id }).collect()
    }

    #[cfg(test)]
    pub fn user_ratings(&self) -> Vec<UserRating> {
        self.tables().unwrap().user_ratings.clone()
    }

    #[cfg(test)]
    pub fn people(&self) -> Vec<NewPerson> {
        self.tables().unwrap().people.iter().map(|(_, p)| p.clone()).collect()
    }

    /// `(title, avg_rating, num_votes)` for a stored external id
    #[cfg(test)]
    pub fn title(&self, imdb_tconst: &str) -> Option<(NewTitle, Option<f64>, Option<i64>)> {
        let tables = self.tables().unwrap();
        let pos = *tables.title_index.get(imdb_tconst)?;
        let stored = &tables.titles[pos];
        Some((stored.row.clone(), stored.avg_rating, stored.num_votes))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn write_batch(&self, batch: &Batch) -> Result<u64> {
        self.tables()?.apply(batch)
    }

    async fn natural_keys(&self, kind: EntityKind) -> Result<Vec<(String, i64)>> {
        let tables = self.tables()?;
        Ok(match kind {
            EntityKind::Person => tables.people.iter().map(|(id, p)| (p.imdb_nconst.clone(), *id)).collect(),
            EntityKind::Title => tables.titles.iter().map(|t| (t.row.imdb_tconst.clone(), t.title_id)).collect(),
            EntityKind::Genre => tables.genres.iter().map(|(id, name)| (name.clone(), *id)).collect(),
        })
    }

    async fn tier_titles(&self, tier: &RatingTier) -> Result<Vec<i64>> {
        let tables = self.tables()?;
        let mut matches: Vec<&StoredTitle> = tables
            .titles
            .iter()
            .filter(|t| t.avg_rating.is_some_and(|r| r >= tier.min_rating))
            .filter(|t| t.num_votes.is_some_and(|v| v >= tier.min_votes))
            .filter(|t| match tier.min_start_year {
                Some(year) => t.row.start_year.is_some_and(|y| y >= year),
                None => true,
            })
            .collect();

        matches.sort_by(|a, b| {
            let primary = match tier.order {
                TierOrder::Rating => desc(a.avg_rating, b.avg_rating).then_with(|| b.num_votes.cmp(&a.num_votes)),
                TierOrder::Recency => {
                    b.row.start_year.cmp(&a.row.start_year).then_with(|| desc(a.avg_rating, b.avg_rating))
                }
            };
            primary.then_with(|| a.title_id.cmp(&b.title_id))
        });

        Ok(matches.into_iter().take(tier.limit).map(|t| t.title_id).collect())
    }

    async fn count_rows(&self, table: &str) -> Result<i64> {
        let tables = self.tables()?;
        let count = match table {
            "genre_lookup" => tables.genres.len(),
            "person" => tables.people.len(),
            "title" => tables.titles.len(),
            "title_genre" => tables.title_genres.len(),
            "title_person_role" => tables.roles.len(),
            "user_rating" => tables.user_ratings.len(),
            other => bail!("Unknown table {} (expected one of {:?})", other, TABLES),
        };
        Ok(count as i64)
    }

    async fn titles_by_category(&self) -> Result<Vec<(String, i64)>> {
        let tables = self.tables()?;
        let mut counts = BTreeMap::new();
        for title in &tables.titles {
            *counts.entry(title.row.category.as_str().to_string()).or_insert(0) += 1;
        }
        Ok(sorted_counts(counts))
    }

    async fn roles_by_kind(&self) -> Result<Vec<(String, i64)>> {
        let tables = self.tables()?;
        let mut counts = BTreeMap::new();
        for role in &tables.roles {
            *counts.entry(role.role.as_str().to_string()).or_insert(0) += 1;
        }
        Ok(sorted_counts(counts))
    }

    async fn user_rating_stats(&self) -> Result<Option<UserRatingStats>> {
        let tables = self.tables()?;
        let ratings = &tables.user_ratings;
        if ratings.is_empty() {
            return Ok(None);
        }

        let sum: i64 = ratings.iter().map(|r| r.rating_value as i64).sum();
        Ok(Some(UserRatingStats {
            total: ratings.len() as i64,
            average: sum as f64 / ratings.len() as f64,
            min: ratings.iter().map(|r| r.rating_value).min().unwrap_or_default(),
            max: ratings.iter().map(|r| r.rating_value).max().unwrap_or_default(),
        }))
    }
}
