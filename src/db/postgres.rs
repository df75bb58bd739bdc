/// PostgreSQL Store
///
/// Connection pool management, the embedded schema migration, and the bulk
/// statements behind `Store`. Every batch runs in its own transaction.
use super::{Batch, Store, MAX_BIND_PARAMS, TABLES};
use crate::models::{EntityKind, RatingTier, TierOrder, UserRatingStats};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};

pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    ///
    /// The loader is strictly sequential, so one connection is enough.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL database")?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await.context("Failed to run database migrations")?;

        tracing::info!("Database migrations completed successfully");
        Ok(())
    }

    /// Test the database connection
    pub async fn test_connection(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await.context("Database connection test failed")?;

        Ok(())
    }

    /// Release the pool's connections
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn grouped_counts(&self, sql: &str) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }
}

#[async_trait]
impl Store for Database {
    async fn write_batch(&self, batch: &Batch) -> Result<u64> {
        if batch.is_empty() {
            return Ok(0);
        }
        if batch.bind_count() > MAX_BIND_PARAMS {
            anyhow::bail!(
                "Batch of {} rows for {} needs {} bind parameters (limit {})",
                batch.len(),
                batch.table(),
                batch.bind_count(),
                MAX_BIND_PARAMS
            );
        }

        let mut tx = self.pool.begin().await?;

        let result = match batch {
            Batch::Genres(rows) => {
                let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("INSERT INTO genre_lookup (genre_name) ");
                qb.push_values(rows, |mut b, row| {
                    b.push_bind(&row.genre_name);
                });
                qb.push(" ON CONFLICT (genre_name) DO NOTHING");
                qb.build().execute(&mut *tx).await?
            }
            Batch::People(rows) => {
                let mut qb: QueryBuilder<'_, Postgres> =
                    QueryBuilder::new("INSERT INTO person (imdb_nconst, primary_name, birth_year, death_year) ");
                qb.push_values(rows, |mut b, row| {
                    b.push_bind(&row.imdb_nconst)
                        .push_bind(&row.primary_name)
                        .push_bind(row.birth_year)
                        .push_bind(row.death_year);
                });
                qb.push(" ON CONFLICT (imdb_nconst) DO NOTHING");
                qb.build().execute(&mut *tx).await?
            }
            Batch::Titles(rows) => {
                let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
                    "INSERT INTO title (imdb_tconst, primary_title, title_type, start_year, runtime_minutes, is_adult) ",
                );
                qb.push_values(rows, |mut b, row| {
                    b.push_bind(&row.imdb_tconst)
                        .push_bind(&row.primary_title)
                        .push_bind(row.category.as_str())
                        .push_bind(row.start_year)
                        .push_bind(row.runtime_minutes)
                        .push_bind(row.is_adult);
                });
                qb.push(" ON CONFLICT (imdb_tconst) DO NOTHING");
                qb.build().execute(&mut *tx).await?
            }
            Batch::Ratings(rows) => {
                let tconsts: Vec<String> = rows.iter().map(|r| r.imdb_tconst.clone()).collect();
                let ratings: Vec<f64> = rows.iter().map(|r| r.avg_rating).collect();
                let votes: Vec<i64> = rows.iter().map(|r| r.num_votes).collect();

                // One round-trip: UNNEST expands the arrays into an update source
                sqlx::query(
                    r#"
                    UPDATE title AS t
                    SET avg_rating = v.avg_rating, num_votes = v.num_votes
                    FROM UNNEST($1::text[], $2::float8[], $3::int8[]) AS v(imdb_tconst, avg_rating, num_votes)
                    WHERE t.imdb_tconst = v.imdb_tconst
                    "#,
                )
                .bind(tconsts)
                .bind(ratings)
                .bind(votes)
                .execute(&mut *tx)
                .await?
            }
            Batch::TitleGenres(rows) => {
                let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("INSERT INTO title_genre (title_id, genre_id) ");
                qb.push_values(rows, |mut b, row| {
                    b.push_bind(row.title_id).push_bind(row.genre_id);
                });
                qb.push(" ON CONFLICT (title_id, genre_id) DO NOTHING");
                qb.build().execute(&mut *tx).await?
            }
            Batch::Roles(rows) => {
                let mut qb: QueryBuilder<'_, Postgres> =
                    QueryBuilder::new("INSERT INTO title_person_role (title_id, person_id, role_type, characters) ");
                qb.push_values(rows, |mut b, row| {
                    b.push_bind(row.title_id)
                        .push_bind(row.person_id)
                        .push_bind(row.role.as_str())
                        .push_bind(row.characters.as_deref());
                });
                // The natural key is an expression index (COALESCE on characters), so no conflict target
                qb.push(" ON CONFLICT DO NOTHING");
                qb.build().execute(&mut *tx).await?
            }
            Batch::UserRatings(rows) => {
                let mut qb: QueryBuilder<'_, Postgres> =
                    QueryBuilder::new("INSERT INTO user_rating (user_id, title_id, rating_value, review_text) ");
                qb.push_values(rows, |mut b, row| {
                    b.push_bind(row.user_id)
                        .push_bind(row.title_id)
                        .push_bind(row.rating_value)
                        .push_bind(row.review_text.as_deref());
                });
                qb.push(" ON CONFLICT (user_id, title_id) DO NOTHING");
                qb.build().execute(&mut *tx).await?
            }
        };

        tx.commit().await?;

        tracing::debug!("Wrote {} of {} rows to {}", result.rows_affected(), batch.len(), batch.table());
        Ok(result.rows_affected())
    }

    async fn natural_keys(&self, kind: EntityKind) -> Result<Vec<(String, i64)>> {
        let sql = match kind {
            EntityKind::Person => "SELECT imdb_nconst, person_id FROM person",
            EntityKind::Title => "SELECT imdb_tconst, title_id FROM title",
            EntityKind::Genre => "SELECT genre_name, genre_id FROM genre_lookup",
        };

        let keys = sqlx::query_as::<_, (String, i64)>(sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to read {} keys", kind.as_str()))?;

        Ok(keys)
    }

    async fn tier_titles(&self, tier: &RatingTier) -> Result<Vec<i64>> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT title_id FROM title WHERE avg_rating >= ");
        qb.push_bind(tier.min_rating);
        qb.push(" AND num_votes >= ");
        qb.push_bind(tier.min_votes);
        if let Some(year) = tier.min_start_year {
            qb.push(" AND start_year >= ");
            qb.push_bind(year);
        }
        qb.push(match tier.order {
            TierOrder::Rating => " ORDER BY avg_rating DESC, num_votes DESC, title_id",
            TierOrder::Recency => " ORDER BY start_year DESC, avg_rating DESC, title_id",
        });
        qb.push(" LIMIT ");
        qb.push_bind(tier.limit as i64);

        let ids = qb.build_query_scalar::<i64>().fetch_all(&self.pool).await.context("Failed to query rating tier")?;
        Ok(ids)
    }

    async fn count_rows(&self, table: &str) -> Result<i64> {
        if !TABLES.contains(&table) {
            anyhow::bail!("Unknown table {}", table);
        }

        let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to count {}", table))?;

        Ok(count)
    }

    async fn titles_by_category(&self) -> Result<Vec<(String, i64)>> {
        self.grouped_counts("SELECT title_type, COUNT(*) FROM title GROUP BY title_type ORDER BY 2 DESC, 1").await
    }

    async fn roles_by_kind(&self) -> Result<Vec<(String, i64)>> {
        self.grouped_counts("SELECT role_type, COUNT(*) FROM title_person_role GROUP BY role_type ORDER BY 2 DESC, 1")
            .await
    }

    async fn user_rating_stats(&self) -> Result<Option<UserRatingStats>> {
        let (total, average, min, max) = sqlx::query_as::<_, (i64, Option<f64>, Option<i16>, Option<i16>)>(
            "SELECT COUNT(*), AVG(rating_value)::float8, MIN(rating_value), MAX(rating_value) FROM user_rating",
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to read user rating statistics")?;

        Ok(match (average, min, max) {
            (Some(average), Some(min), Some(max)) if total > 0 => Some(UserRatingStats { total, average, min, max }),
            _ => None,
        })
    }
}
