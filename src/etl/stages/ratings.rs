/// IMDb ratings loader (`title.ratings.tsv`)
///
/// Sets `avg_rating`/`num_votes` on titles already in the title map; the file
/// covers the whole dataset, so most lines are routinely unresolved.
use super::{LoadContext, Progress, StageOutcome};
use crate::db::Store;
use crate::error::LoadResult;
use crate::etl::extract::RecordSource;
use crate::etl::load::BatchSink;
use crate::etl::parsers::{parse_rating, rating, Fields};
use crate::models::EntityKind;

pub const FILE: &str = "title.ratings.tsv";

/// Lines for titles outside the title map are counted as unresolved before their numbers are parsed
pub async fn load_ratings<S: Store + ?Sized>(ctx: &mut LoadContext<'_, S>) -> LoadResult<StageOutcome> {
    let path = ctx.source_path(FILE);
    let mut source = RecordSource::open(&path, rating::MIN_FIELDS)?;
    let mut sink = BatchSink::new(ctx.store, ctx.batch_size);
    let progress = Progress::new("ratings", 10_000);
    let mut outcome = StageOutcome::default();

    for record in source.by_ref() {
        if ctx.resolver.resolve(EntityKind::Title, record.field(0)).is_none() {
            outcome.unresolved += 1;
            continue;
        }

        let update = parse_rating(&Fields::new(&path, &record))?;
        sink.stage(update).await;
        outcome.accepted += 1;
        progress.tick(outcome.accepted, &mut *ctx.reporter);
    }

    outcome.record_source(&mut source)?;
    outcome.sink = sink.finish().await;
    Ok(outcome)
}
