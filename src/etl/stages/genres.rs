/// Genre seeding
///
/// Inserts the fixed canonical genre list; re-seeding is a no-op.
use super::{LoadContext, StageOutcome};
use crate::db::Store;
use crate::error::LoadResult;
use crate::etl::load::BatchSink;
use crate::models::{NewGenre, GENRES};

pub async fn seed_genres<S: Store + ?Sized>(ctx: &mut LoadContext<'_, S>) -> LoadResult<StageOutcome> {
    let mut sink = BatchSink::new(ctx.store, ctx.batch_size);

    for name in GENRES {
        sink.stage(NewGenre { genre_name: name.to_string() }).await;
    }

    Ok(StageOutcome { accepted: GENRES.len() as u64, sink: sink.finish().await, ..Default::default() })
}
