//! Centralized error handling for HidroAnalise
//!
//! Every fallible operation in the crate returns [`Result`]. The pipeline
//! treats most of these as per-station failures: the station is logged and
//! skipped, and the run carries on with the next one.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for HidroAnalise operations
#[derive(Debug, Error)]
pub enum HidroError {
    /// I/O operation errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed
    #[error("Invalid configuration in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Configuration value rejected after parsing
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Station file has no line starting with `Data`
    #[error("No 'Data' header line found in {path}")]
    MissingHeader { path: PathBuf },

    /// Station file header was found but no row could be parsed
    #[error("No records could be extracted from {path}")]
    NoRecords { path: PathBuf },

    /// A `YYYY-MM` period string could not be parsed
    #[error("Invalid period '{value}': expected YYYY-MM")]
    InvalidPeriod { value: String },

    /// Not enough observations for the requested computation
    #[error("Insufficient data for {what}: need at least {needed}, got {got}")]
    InsufficientData {
        what: String,
        needed: usize,
        got: usize,
    },

    /// Statistics computation errors
    #[error("Statistics computation error: {0}")]
    Statistics(String),

    /// Linear system could not be solved
    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    /// Model fitting failed
    #[error("Model fit failed ({family}): {message}")]
    ModelFit { family: String, message: String },

    /// Aggregated totals do not match the daily source
    #[error("Aggregation totals do not reconcile for {what}: expected {expected:.3}, got {actual:.3}")]
    Reconciliation {
        what: String,
        expected: f64,
        actual: f64,
    },

    /// Chart rendering failed
    #[error("Chart rendering error: {0}")]
    Chart(String),

    /// Thread pool configuration error
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// Output directory is missing
    #[error("Output directory not found: {path}")]
    OutputDirMissing { path: PathBuf },
}

impl HidroError {
    /// Shorthand for an [`HidroError::InsufficientData`] error
    pub fn insufficient(what: impl Into<String>, needed: usize, got: usize) -> Self {
        Self::InsufficientData {
            what: what.into(),
            needed,
            got,
        }
    }

    /// Shorthand for an [`HidroError::ModelFit`] error
    pub fn model_fit(family: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModelFit {
            family: family.into(),
            message: message.into(),
        }
    }
}

impl From<plotters::drawing::DrawingAreaErrorKind<std::io::Error>> for HidroError {
    fn from(error: plotters::drawing::DrawingAreaErrorKind<std::io::Error>) -> Self {
        HidroError::Chart(error.to_string())
    }
}

/// Result type alias for HidroAnalise operations
pub type Result<T> = std::result::Result<T, HidroError>;
