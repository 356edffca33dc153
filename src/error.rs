//! Error types for the influence analyzer

use thiserror::Error;

/// Library result type
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors surfaced by the analysis pipeline
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// A configuration value is outside its valid range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A long-running computation was cancelled cooperatively
    #[error("analysis cancelled")]
    Cancelled,

    /// Input file does not exist or has an unsupported format
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Parquet / dataframe error
    #[error("dataframe error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Worker pool could not be configured
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Reasons a single transaction row is rejected during ingestion.
///
/// Row errors are never fatal: the row is logged and dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    /// A required field is absent or empty
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// An id field is present but not a non-negative integer
    #[error("invalid id `{value}` in field `{field}`")]
    InvalidId { field: &'static str, value: String },

    /// Buyer and seller are the same user
    #[error("self-loop on user {0}")]
    SelfLoop(u64),
}
