use std::path::PathBuf;

use thiserror::Error;

/// Failures of the `clean` pass. Every variant names the file involved.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to open '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read '{}': {source}", path.display())]
    Read { path: PathBuf, source: csv::Error },

    #[error("'{}' has no '{column}' column", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("failed to write '{}': {source}", path.display())]
    Write { path: PathBuf, source: csv::Error },

    #[error("failed to finalize '{}': {source}", path.display())]
    Finalize {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failures of the `report` consumer.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("cleaned table '{}' not found; run `ufc_clean clean` first", path.display())]
    MissingCleaned { path: PathBuf },

    #[error("failed to read '{}': {source}", path.display())]
    Read { path: PathBuf, source: csv::Error },

    #[error("cannot fit trend: {0}")]
    Trend(String),

    #[error("failed to render '{}': {message}", path.display())]
    Chart { path: PathBuf, message: String },
}
