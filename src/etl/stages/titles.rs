/// Title loader and title-genre linker (`title.basics.tsv`)
///
/// The same file feeds two stages: titles are inserted first, then, once the
/// title map is rebuilt, the genre column is re-read to emit the links.
use super::{LoadContext, Progress, StageOutcome};
use crate::db::Store;
use crate::error::LoadResult;
use crate::etl::extract::RecordSource;
use crate::etl::load::BatchSink;
use crate::etl::parsers::{parse_genre_list, parse_title, title, Fields};
use crate::models::{EntityKind, TitleGenre};

pub const FILE: &str = "title.basics.tsv";

/// Load up to `limit` titles whose category is on the allow-list
pub async fn load_titles<S: Store + ?Sized>(ctx: &mut LoadContext<'_, S>, limit: u64) -> LoadResult<StageOutcome> {
    let path = ctx.source_path(FILE);
    let mut source = RecordSource::open(&path, title::MIN_FIELDS)?;
    let mut sink = BatchSink::new(ctx.store, ctx.batch_size);
    let progress = Progress::new("titles", 5_000);
    let mut outcome = StageOutcome::default();

    while outcome.accepted < limit {
        let Some(record) = source.next() else { break };
        let Some(row) = parse_title(&Fields::new(&path, &record))? else {
            outcome.filtered += 1;
            continue;
        };

        sink.stage(row).await;
        outcome.accepted += 1;
        progress.tick(outcome.accepted, &mut *ctx.reporter);
    }

    outcome.record_source(&mut source)?;
    outcome.sink = sink.finish().await;
    Ok(outcome)
}

/// Link every resolved title to its recognized genres
pub async fn link_title_genres<S: Store + ?Sized>(ctx: &mut LoadContext<'_, S>) -> LoadResult<StageOutcome> {
    let path = ctx.source_path(FILE);
    let mut source = RecordSource::open(&path, title::MIN_FIELDS)?;
    let mut sink = BatchSink::new(ctx.store, ctx.batch_size);
    let progress = Progress::new("title-genre links", 10_000);
    let mut outcome = StageOutcome::default();

    for record in source.by_ref() {
        let fields = Fields::new(&path, &record);
        let (tconst, genres) = parse_genre_list(&fields);

        let Some(title_id) = ctx.resolver.resolve(EntityKind::Title, tconst) else {
            outcome.unresolved += 1;
            continue;
        };

        for genre in genres {
            // Tokens outside the seeded list are dropped
            let Some(genre_id) = ctx.resolver.resolve(EntityKind::Genre, genre) else {
                outcome.filtered += 1;
                continue;
            };

            sink.stage(TitleGenre { title_id, genre_id }).await;
            outcome.accepted += 1;
            progress.tick(outcome.accepted, &mut *ctx.reporter);
        }
    }

    outcome.record_source(&mut source)?;
    outcome.sink = sink.finish().await;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::etl::stages::seed_genres;
    use crate::etl::stages::testing::write_tsv;
    use crate::models::TitleCategory;
    use crate::report::RecordingReporter;
    use tempfile::TempDir;

    const HEADER: &str = "tconst\ttitleType\tprimaryTitle\toriginalTitle\tisAdult\tstartYear\tendYear\truntimeMinutes\tgenres";

    #[tokio::test]
    async fn test_example_title_and_genre_links() {
        let dir = TempDir::new().unwrap();
        write_tsv(&dir, FILE, &[HEADER, "tt0000001\tmovie\tExample\t0\t0\t1995\t\\N\t90\tDrama,Action"]);
        let store = MemoryStore::new();
        let mut reporter = RecordingReporter::default();
        let mut ctx = LoadContext::new(&store, dir.path(), 1000, &mut reporter);

        seed_genres(&mut ctx).await.unwrap();
        ctx.resolver.rebuild(EntityKind::Genre, &store).await.unwrap();
        assert_eq!(load_titles(&mut ctx, 1).await.unwrap().accepted, 1);
        ctx.resolver.rebuild(EntityKind::Title, &store).await.unwrap();
        let links = link_title_genres(&mut ctx).await.unwrap();

        let (title, avg_rating, num_votes) = store.title("tt0000001").unwrap();
        assert_eq!(title.category, TitleCategory::Movie);
        assert_eq!(title.start_year, Some(1995));
        assert_eq!(title.runtime_minutes, Some(90));
        assert!(!title.is_adult);
        assert_eq!((avg_rating, num_votes), (None, None));

        assert_eq!(links.accepted, 2);
        let drama = ctx.resolver.resolve(EntityKind::Genre, "Drama").unwrap();
        let action = ctx.resolver.resolve(EntityKind::Genre, "Action").unwrap();
        let mut genre_ids: Vec<i64> = store.title_genres().iter().map(|l| l.genre_id).collect();
        genre_ids.sort_unstable();
        assert_eq!(genre_ids, vec![action, drama]);
    }

    #[tokio::test]
    async fn test_filtered_categories_do_not_count_toward_limit() {
        let dir = TempDir::new().unwrap();
        write_tsv(
            &dir,
            FILE,
            &[
                HEADER,
                "tt0000001\tshort\tA Short\tA Short\t0\t1894\t\\N\t1\tDocumentary,Short",
                "tt0000002\tvideoGame\tA Game\tA Game\t0\t2001\t\\N\t\\N\tAction",
                "tt0000003\ttvSeries\tA Series\tA Series\t0\t1990\t1995\t30\tComedy",
                "tt0000004\ttvEpisode\tAn Episode\tAn Episode\t1\t\\N\t\\N\t\\N\t\\N",
                "tt0000005\tmovie\tOne Too Many\tOne Too Many\t0\t2000\t\\N\t100\tDrama",
            ],
        );
        let store = MemoryStore::new();
        let mut reporter = RecordingReporter::default();
        let mut ctx = LoadContext::new(&store, dir.path(), 1000, &mut reporter);

        let outcome = load_titles(&mut ctx, 2).await.unwrap();
        assert_eq!(outcome.accepted, 2);
        assert_eq!(outcome.filtered, 2);
        assert_eq!(outcome.scanned, 4);

        let (episode, _, _) = store.title("tt0000004").unwrap();
        assert_eq!(episode.category, TitleCategory::Episode);
        assert!(episode.is_adult);
        assert_eq!(episode.start_year, None);
        assert!(store.title("tt0000005").is_none());
    }

    #[tokio::test]
    async fn test_links_skip_unknown_titles_and_genres() {
        let dir = TempDir::new().unwrap();
        write_tsv(
            &dir,
            FILE,
            &[
                HEADER,
                "tt0000001\tmovie\tKept\tKept\t0\t1995\t\\N\t90\tDrama,Cyberpunk",
                "tt0000002\tmovie\tNot Loaded\tNot Loaded\t0\t1995\t\\N\t90\tDrama",
            ],
        );
        let store = MemoryStore::new();
        let mut reporter = RecordingReporter::default();
        let mut ctx = LoadContext::new(&store, dir.path(), 1000, &mut reporter);

        seed_genres(&mut ctx).await.unwrap();
        ctx.resolver.rebuild(EntityKind::Genre, &store).await.unwrap();
        load_titles(&mut ctx, 1).await.unwrap();
        ctx.resolver.rebuild(EntityKind::Title, &store).await.unwrap();

        let outcome = link_title_genres(&mut ctx).await.unwrap();
        assert_eq!(outcome.accepted, 1);
        assert_eq!(outcome.filtered, 1);
        assert_eq!(outcome.unresolved, 1);
        assert_eq!(store.title_genres(), vec![TitleGenre { title_id: 1, genre_id: ctx.resolver.resolve(EntityKind::Genre, "Drama").unwrap() }]);
    }
}
