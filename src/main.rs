/// IMDb Dataset Loader
///
/// An ETL pipeline for loading the IMDb flat-file exports into PostgreSQL.
mod cli;
mod db;
mod error;
mod etl;
mod models;
mod pipeline;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use db::{Database, MemoryStore};
use pipeline::{Pipeline, PipelineStats};
use report::ConsoleReporter;
use std::env;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    cli.validate()?;

    println!("🚀 Starting IMDb Loader...");

    let config = cli.loader_config();
    let mut reporter = ConsoleReporter;

    let stats = if cli.dry_run {
        println!("🧪 Dry run: loading into an in-memory store");
        let store = MemoryStore::new();
        Pipeline::new(&store, config).run(&mut reporter).await
    } else {
        let database_url = match cli.database_url.clone() {
            Some(url) => url,
            None => env::var("DATABASE_URL")
                .context("DATABASE_URL not found in environment. Please check your .env file")?,
        };

        println!("\n💾 Connecting to PostgreSQL database...");
        let database = Database::new(&database_url).await.context("Failed to connect to PostgreSQL database")?;

        // Test database connection
        database.test_connection().await.context("Database connection test failed")?;

        println!("✅ Database connected successfully!");

        if cli.migrate {
            println!("📋 Running database migrations...");
            database.migrate().await.context("Failed to run database migrations")?;

            println!("✅ Database schema created successfully!");
        }

        let stats = Pipeline::new(&database, config).run(&mut reporter).await;
        database.close().await;
        stats
    };

    if let (Some(path), Some(report)) = (&cli.report_json, &stats.report) {
        report.write_json(path)?;
    }

    finish(&stats)
}

fn finish(stats: &PipelineStats) -> Result<()> {
    match stats.errors.first() {
        None => {
            tracing::info!("IMDb load finished in {:.2}s", stats.elapsed_time.as_secs_f64());
            println!("\n✨ Load complete!");
            Ok(())
        }
        Some(first) => anyhow::bail!("Load failed at stage {}: {}", first.stage, first.message),
    }
}
