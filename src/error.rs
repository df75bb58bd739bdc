/// Error Module
///
/// Failure taxonomy for the loading stages. Unresolved references are not
/// errors (stages skip them) and failed batch flushes are absorbed by the
/// `BatchSink`, so neither appears here.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    /// The input file for a stage does not exist; only that stage is skipped
    #[error("source file not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    SourceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A numeric field could not be coerced
    #[error("{}:{line}: invalid {field} value {value:?}", path.display())]
    InvalidField { path: PathBuf, line: u64, field: &'static str, value: String },

    #[error("store operation failed: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl LoadError {
    /// Whether the pipeline may carry on with the next stage
    pub fn is_stage_local(&self) -> bool {
        matches!(self, Self::SourceNotFound { .. })
    }
}

pub type LoadResult<T> = Result<T, LoadError>;
