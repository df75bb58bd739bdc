/// Stages Module
///
/// One loader per entity or relationship kind. Every stage has the same shape:
/// read candidates, resolve foreign keys through the `KeyResolver`, skip what
/// does not resolve, stage rows into a `BatchSink`, stop after `limit` accepted
/// records.
pub mod genres;
pub mod people;
pub mod ratings;
pub mod roles;
pub mod synthetic;
pub mod titles;

pub use genres::seed_genres;
pub use people::load_people;
pub use ratings::load_ratings;
pub use roles::{load_crew_roles, load_principal_roles};
pub use synthetic::synthesize_user_ratings;
pub use titles::{link_title_genres, load_titles};

use crate::db::Store;
use crate::error::LoadResult;
use crate::etl::extract::RecordSource;
use crate::etl::load::SinkSummary;
use crate::etl::resolve::KeyResolver;
use crate::report::Reporter;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// State shared by the stages of one run
pub struct LoadContext<'a, S: Store + ?Sized> {
    pub store: &'a S,
    pub resolver: KeyResolver,
    pub data_dir: PathBuf,
    pub batch_size: usize,
    pub reporter: &'a mut dyn Reporter,
}

impl<'a, S: Store + ?Sized> LoadContext<'a, S> {
    pub fn new(store: &'a S, data_dir: impl AsRef<Path>, batch_size: usize, reporter: &'a mut dyn Reporter) -> Self {
        Self { store, resolver: KeyResolver::new(), data_dir: data_dir.as_ref().to_path_buf(), batch_size, reporter }
    }

    pub fn source_path(&self, file_name: &str) -> PathBuf {
        self.data_dir.join(file_name)
    }
}

/// What one stage did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageOutcome {
    /// Records (or link rows) staged for writing; limits count these
    pub accepted: u64,
    /// Data lines read from the source file
    pub scanned: u64,
    /// Lines dropped for too few fields
    pub malformed: u64,
    /// Records outside an allow-list or role mapping
    pub filtered: u64,
    /// References to keys not present in the resolver
    pub unresolved: u64,
    pub sink: SinkSummary,
}

impl StageOutcome {
    /// Copy the reader's counters; fails if reading stopped on an I/O error
    fn record_source(&mut self, source: &mut RecordSource) -> LoadResult<()> {
        self.scanned = source.scanned();
        self.malformed = source.skipped();
        tracing::debug!("{}: {} lines scanned, {} malformed", source.path().display(), self.scanned, self.malformed);
        source.finish()
    }
}

/// Emits a throughput signal every `every` accepted records
struct Progress {
    label: &'static str,
    every: u64,
    started: Instant,
}

impl Progress {
    fn new(label: &'static str, every: u64) -> Self {
        Self { label, every, started: Instant::now() }
    }

    fn tick(&self, count: u64, reporter: &mut dyn Reporter) {
        if count > 0 && count % self.every == 0 {
            reporter.progress(self.label, count, self.started.elapsed());
        }
    }
}
