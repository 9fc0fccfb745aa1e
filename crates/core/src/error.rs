//! Error types for the pacmon domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

use crate::fiscal_year::FiscalYear;
use crate::program::ProgramCode;
use crate::record::Dimension;

/// The top-level error type for pacmon operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Pipeline errors ---
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- I/O ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures raised by an [`ExpenditureProvider`](crate::provider::ExpenditureProvider).
///
/// These never leave the fetch layer: they are normalized into
/// [`PipelineError::ProviderQueryFailed`] before reaching consolidation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("Query endpoint returned an error: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Errors surfaced by the retrieval and aggregation pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("No program selected; nothing to query")]
    EmptySelection,

    #[error("Fiscal year {year} is outside the supported range {min}-{max}")]
    InvalidFiscalYear { year: i32, min: i32, max: i32 },

    #[error("Query failed for action {code} in {year}: {cause}")]
    ProviderQueryFailed {
        code: ProgramCode,
        year: FiscalYear,
        cause: String,
    },

    #[error("Dataset has no {0} breakdown; request a detail level that includes it")]
    MissingDimension(Dimension),
}

impl PipelineError {
    /// Program code of a failed fetch, if this is a per-program failure.
    pub fn failed_code(&self) -> Option<&ProgramCode> {
        match self {
            Self::ProviderQueryFailed { code, .. } => Some(code),
            _ => None,
        }
    }
}
