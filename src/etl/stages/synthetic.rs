/// Synthetic user ratings
///
/// Derives a small deterministic set of demo ratings from the popularity tiers
/// of the titles already loaded. Same titles in, same ratings out.
use super::{LoadContext, Progress, StageOutcome};
use crate::db::Store;
use crate::error::LoadResult;
use crate::etl::load::BatchSink;
use crate::models::{RatingTier, TierOrder, UserRating};
use std::collections::HashSet;

pub const USER_IDS: [i64; 4] = [1, 2, 3, 4];

pub const TIERS: [RatingTier; 3] = [
    RatingTier { min_rating: 8.0, min_votes: 10_000, min_start_year: None, order: TierOrder::Rating, limit: 200 },
    RatingTier { min_rating: 7.0, min_votes: 5_000, min_start_year: None, order: TierOrder::Rating, limit: 300 },
    RatingTier { min_rating: 6.5, min_votes: 1_000, min_start_year: Some(2010), order: TierOrder::Recency, limit: 200 },
];

pub const REVIEWS: [Option<&str>; 10] = [
    Some("Excellent film! Highly recommended."),
    Some("A masterpiece of cinema."),
    Some("Really enjoyed this one."),
    Some("Worth watching, great story."),
    Some("One of my favorites!"),
    Some("Solid entertainment."),
    Some("Good but not great."),
    Some("Decent watch."),
    Some("Could be better."),
    None,
];

/// Rating and review for the title at `position` in the tier list
pub fn synthetic_rating(position: usize, user_id: i64) -> (i16, Option<&'static str>) {
    let base: i64 = match position {
        0..=199 => 7,
        200..=499 => 6,
        _ => 5,
    };
    let spread = (position as i64 + user_id) % 4;
    let rating = (base + spread - 1).clamp(1, 10) as i16;
    let review = REVIEWS[((position as i64 + user_id) % 10) as usize];

    (rating, review)
}

/// Concatenate the tier query results, keeping the first occurrence of each id
async fn tiered_titles<S: Store + ?Sized>(store: &S) -> LoadResult<Vec<i64>> {
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();

    for tier in &TIERS {
        for title_id in store.tier_titles(tier).await? {
            if seen.insert(title_id) {
                ordered.push(title_id);
            }
        }
    }

    Ok(ordered)
}

pub async fn synthesize_user_ratings<S: Store + ?Sized>(ctx: &mut LoadContext<'_, S>) -> LoadResult<StageOutcome> {
    let titles = tiered_titles(ctx.store).await?;
    tracing::info!("Selected {} titles for synthetic ratings", titles.len());

    let mut sink = BatchSink::new(ctx.store, ctx.batch_size);
    let progress = Progress::new("user ratings", 500);
    let mut outcome = StageOutcome::default();

    for (position, &title_id) in titles.iter().enumerate() {
        for user_id in USER_IDS {
            let (rating_value, review) = synthetic_rating(position, user_id);
            sink.stage(UserRating { user_id, title_id, rating_value, review_text: review.map(str::to_string) }).await;
            outcome.accepted += 1;
            progress.tick(outcome.accepted, &mut *ctx.reporter);
        }
    }

    outcome.scanned = titles.len() as u64;
    outcome.sink = sink.finish().await;
    Ok(outcome)
}
