/// CLI Module
///
/// Command-line interface configuration using clap.
use crate::db::MAX_BATCH_SIZE;
use crate::pipeline::LoaderConfig;
use clap::Parser;
use std::path::PathBuf;

/// IMDb Dataset Loader - ETL Pipeline
///
/// Load the IMDb flat-file exports into PostgreSQL
#[derive(Parser, Debug)]
#[command(name = "imdb-loader")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Maximum number of people to load
    #[arg(long, value_name = "COUNT", default_value = "50000")]
    pub people: u64,

    /// Maximum number of titles to load
    #[arg(long, value_name = "COUNT", default_value = "20000")]
    pub titles: u64,

    /// Maximum number of principal cast/crew links to load
    #[arg(long, value_name = "COUNT", default_value = "200000")]
    pub cast: u64,

    /// Maximum number of director/writer links to load from title.crew.tsv
    #[arg(long, value_name = "COUNT", default_value = "50000")]
    pub crew: u64,

    /// Rows per insert batch
    #[arg(short = 'b', long, value_name = "SIZE", default_value = "1000")]
    pub batch_size: usize,

    /// Directory holding the .tsv files
    #[arg(long, value_name = "DIR", env = "DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Database connection URL (overrides DATABASE_URL env var)
    #[arg(short = 'd', long, value_name = "URL")]
    pub database_url: Option<String>,

    /// Apply the embedded schema migrations before loading
    #[arg(long)]
    pub migrate: bool,

    /// Parse and resolve everything against an in-memory store
    #[arg(long, conflicts_with = "migrate")]
    pub dry_run: bool,

    /// Also write the verification report as JSON
    #[arg(long, value_name = "PATH")]
    pub report_json: Option<PathBuf>,
}

impl Cli {
    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("Batch size must be greater than 0");
        }

        if self.batch_size > MAX_BATCH_SIZE {
            anyhow::bail!("Batch size must be at most {} to fit PostgreSQL's bind parameter limit", MAX_BATCH_SIZE);
        }

        for (flag, limit) in [("--people", self.people), ("--titles", self.titles), ("--cast", self.cast), ("--crew", self.crew)] {
            if limit == 0 {
                anyhow::bail!("{} must be greater than 0", flag);
            }
        }

        Ok(())
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            data_dir: self.data_dir.clone(),
            batch_size: self.batch_size,
            people_limit: self.people,
            titles_limit: self.titles,
            cast_limit: self.cast,
            crew_limit: self.crew,
        }
    }
}
