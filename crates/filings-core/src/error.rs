//! Error types for filings ingestion.
//!
//! This module defines [`FilingsError`] which covers the failures that can occur
//! while fetching company facts, reconciling metrics, or writing them to a store.

use thiserror::Error;

/// Errors that can occur during ingestion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilingsError {
    /// Network-related errors (connection failures, timeouts, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limit exceeded by the fact source.
    #[error("Rate limited by {source_name}: retry after {retry_after:?}")]
    RateLimited {
        /// The source that rate limited the request.
        source_name: String,
        /// Suggested time to wait before retrying.
        retry_after: Option<std::time::Duration>,
    },

    /// The company could not be resolved by the fact source.
    #[error("Company not found: {0}")]
    CompanyNotFound(String),

    /// The fact payload for a company could not be fetched.
    #[error("Source unavailable for {company}: {reason}")]
    SourceUnavailable {
        /// Ticker of the company being fetched.
        company: String,
        /// Underlying failure.
        reason: String,
    },

    /// Error parsing data from the source.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error reading from or writing to the metric store.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A metric snapshot was assembled from metrics of different periods.
    #[error("Period mismatch: {metric} belongs to {found}, snapshot is {expected}")]
    PeriodMismatch {
        /// Offending metric name.
        metric: String,
        /// Period the snapshot was built for.
        expected: String,
        /// Period the metric actually carries.
        found: String,
    },

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The run trigger did not present a valid token.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl FilingsError {
    /// Wraps an error as [`FilingsError::SourceUnavailable`] for a company.
    #[must_use]
    pub fn source_unavailable(company: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            company: company.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias using [`FilingsError`].
pub type Result<T> = std::result::Result<T, FilingsError>;
