/// Cast and crew loaders (`title.principals.tsv`, `title.crew.tsv`)
///
/// Both files can describe the same director or writer. Crew-file links carry
/// no character text, and the store's natural key treats a NULL character text
/// as equal to another NULL, so the second source adds nothing for a pair the
/// first one already linked.
use super::{LoadContext, Progress, StageOutcome};
use crate::db::Store;
use crate::error::LoadResult;
use crate::etl::extract::RecordSource;
use crate::etl::load::BatchSink;
use crate::etl::parsers::{crew, parse_crew, parse_principal, principal, Fields};
use crate::models::{EntityKind, RoleKind, TitlePersonRole};

pub const PRINCIPALS_FILE: &str = "title.principals.tsv";
pub const CREW_FILE: &str = "title.crew.tsv";

/// Load up to `limit` principal cast/crew links
pub async fn load_principal_roles<S: Store + ?Sized>(
    ctx: &mut LoadContext<'_, S>,
    limit: u64,
) -> LoadResult<StageOutcome> {
    let path = ctx.source_path(PRINCIPALS_FILE);
    let mut source = RecordSource::open(&path, principal::MIN_FIELDS)?;
    let mut sink = BatchSink::new(ctx.store, ctx.batch_size);
    let progress = Progress::new("principal roles", 20_000);
    let mut outcome = StageOutcome::default();

    while outcome.accepted < limit {
        let Some(record) = source.next() else { break };
        let fields = Fields::new(&path, &record);

        let Some(principal) = parse_principal(&fields) else {
            outcome.filtered += 1;
            continue;
        };

        let title_id = ctx.resolver.resolve(EntityKind::Title, principal.tconst);
        let person_id = ctx.resolver.resolve(EntityKind::Person, principal.nconst);
        let (Some(title_id), Some(person_id)) = (title_id, person_id) else {
            outcome.unresolved += 1;
            continue;
        };

        sink.stage(TitlePersonRole { title_id, person_id, role: principal.role, characters: principal.characters }).await;
        outcome.accepted += 1;
        progress.tick(outcome.accepted, &mut *ctx.reporter);
    }

    outcome.record_source(&mut source)?;
    outcome.sink = sink.finish().await;
    Ok(outcome)
}

/// Expand the director/writer lists into up to `limit` links
pub async fn load_crew_roles<S: Store + ?Sized>(ctx: &mut LoadContext<'_, S>, limit: u64) -> LoadResult<StageOutcome> {
    let path = ctx.source_path(CREW_FILE);
    let mut source = RecordSource::open(&path, crew::MIN_FIELDS)?;
    let mut sink = BatchSink::new(ctx.store, ctx.batch_size);
    let progress = Progress::new("crew roles", 10_000);
    let mut outcome = StageOutcome::default();

    'records: while outcome.accepted < limit {
        let Some(record) = source.next() else { break };
        let crew = parse_crew(&Fields::new(&path, &record));

        let Some(title_id) = ctx.resolver.resolve(EntityKind::Title, crew.tconst) else {
            outcome.unresolved += 1;
            continue;
        };

        let members = crew
            .directors
            .iter()
            .map(|nconst| (*nconst, RoleKind::Director))
            .chain(crew.writers.iter().map(|nconst| (*nconst, RoleKind::Writer)));

        for (nconst, role) in members {
            if outcome.accepted >= limit {
                break 'records;
            }

            let Some(person_id) = ctx.resolver.resolve(EntityKind::Person, nconst) else {
                outcome.unresolved += 1;
                continue;
            };

            sink.stage(TitlePersonRole { title_id, person_id, role, characters: None }).await;
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
    use crate::db::{Batch, MemoryStore};
    use crate::etl::stages::testing::write_tsv;
    use crate::models::{NewPerson, NewTitle, TitleCategory};
    use crate::report::RecordingReporter;
    use tempfile::TempDir;

    const PRINCIPALS_HEADER: &str = "tconst\tordering\tnconst\tcategory\tjob\tcharacters";
    const CREW_HEADER: &str = "tconst\tdirectors\twriters";

    /// Titles tt1..tt2 and people nm1..nm4, with both key maps built
    async fn seeded_context<'a>(
        store: &'a MemoryStore,
        dir: &TempDir,
        reporter: &'a mut RecordingReporter,
    ) -> LoadContext<'a, MemoryStore> {
        let people = (1..=4)
            .map(|i| NewPerson { imdb_nconst: format!("nm{}", i), primary_name: format!("P{}", i), birth_year: None, death_year: None })
            .collect();
        let titles = (1..=2)
            .map(|i| NewTitle {
                imdb_tconst: format!("tt{}", i),
                primary_title: format!("T{}", i),
                category: TitleCategory::Movie,
                start_year: None,
                runtime_minutes: None,
                is_adult: false,
            })
            .collect();
        store.write_batch(&Batch::People(people)).await.unwrap();
        store.write_batch(&Batch::Titles(titles)).await.unwrap();

        let mut ctx = LoadContext::new(store, dir.path(), 1000, reporter);
        ctx.resolver.rebuild(EntityKind::Person, store).await.unwrap();
        ctx.resolver.rebuild(EntityKind::Title, store).await.unwrap();
        ctx
    }

    #[tokio::test]
    async fn test_principals_map_roles_and_characters() {
        let dir = TempDir::new().unwrap();
        write_tsv(
            &dir,
            PRINCIPALS_FILE,
            &[
                PRINCIPALS_HEADER,
                "tt1\t1\tnm1\tactress\t\\N\t[\"Ada\"]",
                "tt1\t2\tnm2\tself\t\\N\t[\"Herself\"]",
                "tt1\t3\tnm3\tdirector\t\\N\t\\N",
                "tt1\t4\tnm9\tactor\t\\N\t[\"Ghost\"]",
                "tt9\t1\tnm1\tactor\t\\N\t\\N",
                "tt2\t1\tnm4\tcomposer",
            ],
        );
        let store = MemoryStore::new();
        let mut reporter = RecordingReporter::default();
        let mut ctx = seeded_context(&store, &dir, &mut reporter).await;

        let outcome = load_principal_roles(&mut ctx, 100).await.unwrap();
        assert_eq!(outcome.accepted, 3);
        assert_eq!(outcome.filtered, 1);
        assert_eq!(outcome.unresolved, 2);

        let roles = store.roles();
        assert_eq!(roles[0], TitlePersonRole { title_id: 1, person_id: 1, role: RoleKind::Actor, characters: Some("Ada".into()) });
        assert_eq!(roles[1], TitlePersonRole { title_id: 1, person_id: 3, role: RoleKind::Director, characters: None });
        assert_eq!(roles[2].role, RoleKind::Composer);
    }

    #[tokio::test]
    async fn test_crew_file_deduplicates_against_principals() {
        let dir = TempDir::new().unwrap();
        write_tsv(&dir, PRINCIPALS_FILE, &[PRINCIPALS_HEADER, "tt1\t1\tnm3\tdirector\t\\N\t\\N"]);
        write_tsv(&dir, CREW_FILE, &[CREW_HEADER, "tt1\tnm3\tnm3,nm4,nm404", "tt404\tnm1\t\\N"]);
        let store = MemoryStore::new();
        let mut reporter = RecordingReporter::default();
        let mut ctx = seeded_context(&store, &dir, &mut reporter).await;

        load_principal_roles(&mut ctx, 100).await.unwrap();
        let crew = load_crew_roles(&mut ctx, 100).await.unwrap();

        assert_eq!(crew.accepted, 3);
        assert_eq!(crew.unresolved, 2);
        assert_eq!(crew.sink.written, 2);

        let directors: Vec<_> = store.roles().into_iter().filter(|r| r.role == RoleKind::Director).collect();
        assert_eq!(directors, vec![TitlePersonRole { title_id: 1, person_id: 3, role: RoleKind::Director, characters: None }]);
        assert_eq!(store.count_rows("title_person_role").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_crew_limit_counts_links() {
        let dir = TempDir::new().unwrap();
        write_tsv(&dir, CREW_FILE, &[CREW_HEADER, "tt1\tnm1,nm2\tnm3", "tt2\tnm4\t\\N"]);
        let store = MemoryStore::new();
        let mut reporter = RecordingReporter::default();
        let mut ctx = seeded_context(&store, &dir, &mut reporter).await;

        let outcome = load_crew_roles(&mut ctx, 2).await.unwrap();
        assert_eq!(outcome.accepted, 2);
        assert_eq!(store.count_rows("title_person_role").await.unwrap(), 2);
        assert!(store.roles().iter().all(|r| r.role == RoleKind::Director));
    }
}
