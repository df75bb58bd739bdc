/// Report Module
///
/// Progress signals, per-stage summaries and the post-load verification
/// report. The pipeline only talks to the `Reporter` trait; the binary plugs
/// in the console implementation.
use crate::db::{Store, TABLES};
use crate::etl::stages::StageOutcome;
use crate::models::UserRatingStats;
use crate::pipeline::{PipelineStage, StageRecord};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Receiver of everything the loader has to say while it runs
pub trait Reporter {
    /// `count` accepted records after `elapsed`
    fn progress(&mut self, label: &str, count: u64, elapsed: Duration);

    /// One `(label, count)` pair of a summary
    fn record(&mut self, label: &str, count: i64);

    fn stage_finished(&mut self, stage: PipelineStage, outcome: &StageOutcome) {
        self.record(&stage.to_string(), outcome.accepted as i64);
    }

    fn stage_skipped(&mut self, _stage: PipelineStage, _reason: &str) {}

    fn stage_failed(&mut self, _stage: PipelineStage, _message: &str) {}

    fn verification(&mut self, report: &VerificationReport) {
        for (table, count) in &report.tables {
            self.record(table, *count);
        }
    }
}

/// Counts read back from the store after loading
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub generated_at: DateTime<Utc>,
    pub tables: Vec<(String, i64)>,
    pub titles_by_category: Vec<(String, i64)>,
    pub roles_by_kind: Vec<(String, i64)>,
    pub user_ratings: Option<UserRatingStats>,
    pub stages: Vec<StageRecord>,
}

impl VerificationReport {
    /// Row count of one table, if it was counted
    #[cfg(test)]
    pub fn count(&self, table: &str) -> Option<i64> {
        self.tables.iter().find(|(name, _)| name == table).map(|(_, count)| *count)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize verification report")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write report to {}", path.display()))?;

        tracing::info!("Verification report written to {}", path.display());
        Ok(())
    }
}

/// Gather table counts and breakdowns from the store
pub async fn verify<S: Store + ?Sized>(store: &S, stages: Vec<StageRecord>) -> Result<VerificationReport> {
    let mut tables = Vec::with_capacity(TABLES.len());
    for table in TABLES {
        tables.push((table.to_string(), store.count_rows(table).await?));
    }

    Ok(VerificationReport {
        generated_at: Utc::now(),
        tables,
        titles_by_category: store.titles_by_category().await?,
        roles_by_kind: store.roles_by_kind().await?,
        user_ratings: store.user_rating_stats().await?,
        stages,
    })
}

/// Human-facing output on stdout
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn progress(&mut self, label: &str, count: u64, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        let rate = if secs == 0.0 { 0.0 } else { count as f64 / secs };
        println!("   ⏳ {}: {} processed ({:.0}/sec)", label, format_number(count), rate);
    }

    fn record(&mut self, label: &str, count: i64) {
        println!("   {:<20} {:>12}", label, format_count(count));
    }

    fn stage_finished(&mut self, stage: PipelineStage, outcome: &StageOutcome) {
        println!(
            "✅ {}: {} accepted, {} written in {} batches",
            stage,
            format_number(outcome.accepted),
            format_number(outcome.sink.written),
            outcome.sink.batches
        );
        if outcome.scanned > 0 {
            println!(
                "   📄 scanned {}, malformed {}, filtered {}, unresolved {}",
                format_number(outcome.scanned),
                format_number(outcome.malformed),
                format_number(outcome.filtered),
                format_number(outcome.unresolved)
            );
        }
        if outcome.sink.failed_batches > 0 {
            println!("   ⚠️  {} batches rolled back", outcome.sink.failed_batches);
        }
    }

    fn stage_skipped(&mut self, stage: PipelineStage, reason: &str) {
        println!("⚠️  {} skipped: {}", stage, reason);
    }

    fn stage_failed(&mut self, stage: PipelineStage, message: &str) {
        println!("❌ {} failed: {}", stage, message);
    }

    fn verification(&mut self, report: &VerificationReport) {
        println!("\n📊 Table counts:");
        for (table, count) in &report.tables {
            self.record(table, *count);
        }

        println!("\n🎬 Titles by category:");
        for (category, count) in &report.titles_by_category {
            self.record(category, *count);
        }

        println!("\n🎭 Roles by kind:");
        for (role, count) in &report.roles_by_kind {
            self.record(role, *count);
        }

        match &report.user_ratings {
            Some(stats) => println!(
                "\n⭐ User ratings: {} total, average {:.2}, range {}-{}",
                format_count(stats.total),
                stats.average,
                stats.min,
                stats.max
            ),
            None => println!("\n⭐ User ratings: none"),
        }
    }
}

/// Captures every signal for assertions
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub progress: Vec<(String, u64)>,
    pub records: Vec<(String, i64)>,
    pub finished: Vec<(PipelineStage, StageOutcome)>,
    pub skipped: Vec<PipelineStage>,
    pub failed: Vec<(PipelineStage, String)>,
    pub verified: bool,
}

#[cfg(test)]
impl Reporter for RecordingReporter {
    fn progress(&mut self, label: &str, count: u64, _elapsed: Duration) {
        self.progress.push((label.to_string(), count));
    }

    fn record(&mut self, label: &str, count: i64) {
        self.records.push((label.to_string(), count));
    }

    fn stage_finished(&mut self, stage: PipelineStage, outcome: &StageOutcome) {
        self.finished.push((stage, *outcome));
    }

    fn stage_skipped(&mut self, stage: PipelineStage, _reason: &str) {
        self.skipped.push(stage);
    }

    fn stage_failed(&mut self, stage: PipelineStage, message: &str) {
        self.failed.push((stage, message.to_string()));
    }

    fn verification(&mut self, report: &VerificationReport) {
        self.verified = true;
        for (table, count) in &report.tables {
            self.record(table, *count);
        }
    }
}

/// Format a number with thousand separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();

    for (count, c) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}

fn format_count(n: i64) -> String {
    if n < 0 {
        format!("-{}", format_number(n.unsigned_abs()))
    } else {
        format_number(n as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Batch, MemoryStore};
    use crate::models::NewGenre;
    use tempfile::TempDir;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(174283491), "174,283,491");
        assert_eq!(format_count(-4200), "-4,200");
    }

    #[tokio::test]
    async fn test_verify_counts_every_table() {
        let store = MemoryStore::new();
        let genres = ["Drama", "Action"].iter().map(|g| NewGenre { genre_name: g.to_string() }).collect();
        store.write_batch(&Batch::Genres(genres)).await.unwrap();

        let report = verify(&store, Vec::new()).await.unwrap();
        assert_eq!(report.tables.len(), TABLES.len());
        assert_eq!(report.count("genre_lookup"), Some(2));
        assert_eq!(report.count("person"), Some(0));
        assert_eq!(report.count("no_such_table"), None);
        assert!(report.user_ratings.is_none());
    }

    #[tokio::test]
    async fn test_default_verification_feeds_record_sink() {
        struct Pairs(Vec<(String, i64)>);

        impl Reporter for Pairs {
            fn progress(&mut self, _label: &str, _count: u64, _elapsed: Duration) {}

            fn record(&mut self, label: &str, count: i64) {
                self.0.push((label.to_string(), count));
            }
        }

        let store = MemoryStore::new();
        let report = verify(&store, Vec::new()).await.unwrap();
        let mut pairs = Pairs(Vec::new());
        pairs.verification(&report);

        let labels: Vec<&str> = pairs.0.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(labels, TABLES.to_vec());
    }

    #[tokio::test]
    async fn test_report_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");

        let report = verify(&MemoryStore::new(), Vec::new()).await.unwrap();
        report.write_json(&path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["tables"][0], serde_json::json!(["genre_lookup", 0]));
        assert!(value["generated_at"].is_string());
        assert!(value["user_ratings"].is_null());
    }
}
