/// Pipeline Module
///
/// Orchestrates the complete load: seed genres → people → titles → ratings →
/// title genres → principal roles → crew roles → synthetic user ratings →
/// verification, with key-map rebuilds and statistics tracking.
use crate::db::Store;
use crate::error::LoadResult;
use crate::etl::load::DEFAULT_BATCH_SIZE;
use crate::etl::stages::{self, LoadContext, StageOutcome};
use crate::models::EntityKind;
use crate::report::{self, format_number, Reporter, VerificationReport};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineStage {
    SeedGenres,
    People,
    Titles,
    Ratings,
    TitleGenres,
    PrincipalRoles,
    CrewRoles,
    UserRatings,
    Verify,
}

impl PipelineStage {
    /// Loading stages in execution order; `Verify` always follows them
    pub const LOADING: [Self; 8] = [
        Self::SeedGenres,
        Self::People,
        Self::Titles,
        Self::Ratings,
        Self::TitleGenres,
        Self::PrincipalRoles,
        Self::CrewRoles,
        Self::UserRatings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SeedGenres => "seed-genres",
            Self::People => "people",
            Self::Titles => "titles",
            Self::Ratings => "ratings",
            Self::TitleGenres => "title-genres",
            Self::PrincipalRoles => "principal-roles",
            Self::CrewRoles => "crew-roles",
            Self::UserRatings => "user-ratings",
            Self::Verify => "verify",
        }
    }

    /// Key map to rebuild once this stage is done
    fn key_map(&self) -> Option<EntityKind> {
        match self {
            Self::SeedGenres => Some(EntityKind::Genre),
            Self::People => Some(EntityKind::Person),
            Self::Titles => Some(EntityKind::Title),
            _ => None,
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageStatus {
    Completed,
    /// Input file missing
    Skipped,
    Failed,
    /// An earlier stage failed
    NotRun,
}

/// What happened to one stage of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRecord {
    pub stage: PipelineStage,
    pub status: StageStatus,
    pub outcome: Option<StageOutcome>,
    pub message: Option<String>,
}

impl StageRecord {
    fn new(stage: PipelineStage, status: StageStatus) -> Self {
        Self { stage, status, outcome: None, message: None }
    }
}

/// Pipeline error with context
#[derive(Debug, Clone)]
pub struct PipelineError {
    pub stage: PipelineStage,
    pub message: String,
}

/// Pipeline execution statistics
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub stages: Vec<StageRecord>,
    pub elapsed_time: Duration,
    pub errors: Vec<PipelineError>,
    pub report: Option<VerificationReport>,
}

impl PipelineStats {
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn records_accepted(&self) -> u64 {
        self.stages.iter().filter_map(|s| s.outcome).map(|o| o.accepted).sum()
    }

    pub fn records_per_second(&self) -> f64 {
        let secs = self.elapsed_time.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.records_accepted() as f64 / secs
        }
    }

    fn count(&self, status: StageStatus) -> usize {
        self.stages.iter().filter(|s| s.status == status).count()
    }
}

/// Limits, batch size and input location for one run
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub data_dir: PathBuf,
    pub batch_size: usize,
    pub people_limit: u64,
    pub titles_limit: u64,
    pub cast_limit: u64,
    pub crew_limit: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            batch_size: DEFAULT_BATCH_SIZE,
            people_limit: 50_000,
            titles_limit: 20_000,
            cast_limit: 200_000,
            crew_limit: 50_000,
        }
    }
}

/// Main load pipeline
pub struct Pipeline<'a, S: Store + ?Sized> {
    store: &'a S,
    config: LoaderConfig,
}

impl<'a, S: Store + ?Sized> Pipeline<'a, S> {
    pub fn new(store: &'a S, config: LoaderConfig) -> Self {
        Self { store, config }
    }

    /// Run every stage in order, then verify.
    ///
    /// A stage whose input file is missing is skipped. Any other stage error
    /// stops loading; verification still runs and the error lands in
    /// `PipelineStats::errors`.
    pub async fn run(&self, reporter: &mut dyn Reporter) -> PipelineStats {
        let start_time = Instant::now();
        let mut stats = PipelineStats::default();

        tracing::info!("Starting load from {}", self.config.data_dir.display());

        println!("\n🚀 Starting IMDb load...");
        println!("   📂 Data directory: {}", self.config.data_dir.display());
        println!(
            "   🎯 Limits: {} people, {} titles, {} cast, {} crew",
            format_number(self.config.people_limit),
            format_number(self.config.titles_limit),
            format_number(self.config.cast_limit),
            format_number(self.config.crew_limit)
        );
        println!("   📦 Batch size: {}", self.config.batch_size);

        let mut ctx = LoadContext::new(self.store, &self.config.data_dir, self.config.batch_size, reporter);
        let mut aborted = false;

        for stage in PipelineStage::LOADING {
            if aborted {
                stats.stages.push(StageRecord::new(stage, StageStatus::NotRun));
                continue;
            }

            tracing::info!("Stage {} started", stage);
            let mut record = match self.run_stage(stage, &mut ctx).await {
                Ok(outcome) => {
                    tracing::info!(
                        "Stage {} done: {} accepted, {} written, {} failed batches",
                        stage,
                        outcome.accepted,
                        outcome.sink.written,
                        outcome.sink.failed_batches
                    );
                    ctx.reporter.stage_finished(stage, &outcome);
                    StageRecord { outcome: Some(outcome), ..StageRecord::new(stage, StageStatus::Completed) }
                }
                Err(e) if e.is_stage_local() => {
                    tracing::warn!("Stage {} skipped: {}", stage, e);
                    ctx.reporter.stage_skipped(stage, &e.to_string());
                    StageRecord { message: Some(e.to_string()), ..StageRecord::new(stage, StageStatus::Skipped) }
                }
                Err(e) => {
                    aborted = true;
                    self.fail(&mut stats, &mut ctx, stage, e.to_string());
                    StageRecord { message: Some(e.to_string()), ..StageRecord::new(stage, StageStatus::Failed) }
                }
            };

            // Rebuilt even after a skip, so rows from earlier runs still resolve
            if let (false, Some(kind)) = (aborted, stage.key_map()) {
                if let Err(e) = ctx.resolver.rebuild(kind, self.store).await {
                    aborted = true;
                    let message = format!("Failed to rebuild {} keys: {:#}", kind.as_str(), e);
                    self.fail(&mut stats, &mut ctx, stage, message.clone());
                    record.status = StageStatus::Failed;
                    record.message = Some(message);
                }
            }

            stats.stages.push(record);
        }

        match report::verify(self.store, stats.stages.clone()).await {
            Ok(report) => {
                ctx.reporter.verification(&report);
                stats.stages.push(StageRecord::new(PipelineStage::Verify, StageStatus::Completed));
                stats.report = Some(report);
            }
            Err(e) => {
                let message = format!("{:#}", e);
                self.fail(&mut stats, &mut ctx, PipelineStage::Verify, message.clone());
                stats.stages.push(StageRecord { message: Some(message), ..StageRecord::new(PipelineStage::Verify, StageStatus::Failed) });
            }
        }

        stats.elapsed_time = start_time.elapsed();

        if stats.succeeded() {
            println!("\n✅ Load complete!");
        } else {
            println!("\n❌ Load failed!");
        }
        self.print_final_stats(&stats);

        stats
    }

    async fn run_stage(&self, stage: PipelineStage, ctx: &mut LoadContext<'_, S>) -> LoadResult<StageOutcome> {
        match stage {
            PipelineStage::SeedGenres => stages::seed_genres(ctx).await,
            PipelineStage::People => stages::load_people(ctx, self.config.people_limit).await,
            PipelineStage::Titles => stages::load_titles(ctx, self.config.titles_limit).await,
            PipelineStage::Ratings => stages::load_ratings(ctx).await,
            PipelineStage::TitleGenres => stages::link_title_genres(ctx).await,
            PipelineStage::PrincipalRoles => stages::load_principal_roles(ctx, self.config.cast_limit).await,
            PipelineStage::CrewRoles => stages::load_crew_roles(ctx, self.config.crew_limit).await,
            PipelineStage::UserRatings => stages::synthesize_user_ratings(ctx).await,
            // Verification is not a loading stage
            PipelineStage::Verify => Ok(StageOutcome::default()),
        }
    }

    fn fail(&self, stats: &mut PipelineStats, ctx: &mut LoadContext<'_, S>, stage: PipelineStage, message: String) {
        tracing::error!("Stage {} failed: {}", stage, message);
        ctx.reporter.stage_failed(stage, &message);
        stats.errors.push(PipelineError { stage, message });
    }

    /// Print final statistics
    fn print_final_stats(&self, stats: &PipelineStats) {
        println!("\n📊 Pipeline Statistics:");
        println!("   ⏱️  Total time: {:.2}s", stats.elapsed_time.as_secs_f64());
        println!(
            "   📦 Stages: {} completed, {} skipped, {} failed, {} not run",
            stats.count(StageStatus::Completed),
            stats.count(StageStatus::Skipped),
            stats.count(StageStatus::Failed),
            stats.count(StageStatus::NotRun)
        );
        println!("   📝 Records accepted: {}", format_number(stats.records_accepted()));
        println!("   ⚡ Throughput: {:.0} records/sec", stats.records_per_second());

        if !stats.errors.is_empty() {
            println!("\n❌ Errors encountered: {}", stats.errors.len());
            for (i, error) in stats.errors.iter().take(5).enumerate() {
                println!("   {}. [{}] {}", i + 1, error.stage, error.message);
            }
            if stats.errors.len() > 5 {
                println!("   ... and {} more errors", stats.errors.len() - 5);
            }
        }
    }
}
