/// People loader (`name.basics.tsv`)
use super::{LoadContext, Progress, StageOutcome};
use crate::db::Store;
use crate::error::LoadResult;
use crate::etl::extract::RecordSource;
use crate::etl::load::BatchSink;
use crate::etl::parsers::{parse_person, person, Fields};

pub const FILE: &str = "name.basics.tsv";

pub async fn load_people<S: Store + ?Sized>(ctx: &mut LoadContext<'_, S>, limit: u64) -> LoadResult<StageOutcome> {
    let path = ctx.source_path(FILE);
    let mut source = RecordSource::open(&path, person::MIN_FIELDS)?;
    let mut sink = BatchSink::new(ctx.store, ctx.batch_size);
    let progress = Progress::new("people", 10_000);
    let mut outcome = StageOutcome::default();

    while outcome.accepted < limit {
        let Some(record) = source.next() else { break };
        let row = parse_person(&Fields::new(&path, &record))?;

        sink.stage(row).await;
        outcome.accepted += 1;
        progress.tick(outcome.accepted, &mut *ctx.reporter);
    }

    outcome.record_source(&mut source)?;
    outcome.sink = sink.finish().await;
    Ok(outcome)
}
