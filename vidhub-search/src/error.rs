//! Error types for the vidhub-search crate.
//!
//! Errors fall into three classes:
//!
//! - **Caller errors** ([`SearchError::Unauthorized`]) are surfaced
//!   immediately and no fan-out is attempted.
//! - **Source failures** ([`SearchError::Timeout`], [`SearchError::Http`],
//!   [`SearchError::Parse`]) are recovered inside the orchestrator. They
//!   never reach the caller of a query.
//! - **Orchestration failures** ([`SearchError::Registry`],
//!   [`SearchError::Orchestration`]) abort the query and surface as a
//!   generic server error.

/// Errors that can occur while answering a federated search query.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The caller identity is missing or invalid.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The source registry could not resolve the enabled sources.
    #[error("source registry error: {0}")]
    Registry(String),

    /// The aggregation step failed for a reason unrelated to any single source.
    #[error("orchestration error: {0}")]
    Orchestration(String),

    /// A source did not settle before its deadline.
    #[error("source timed out: {0}")]
    Timeout(String),

    /// An HTTP request to a source failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A source response could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The query was cancelled before all sources settled.
    #[error("query cancelled")]
    Cancelled,
}

impl SearchError {
    /// Returns `true` for errors caused by the caller (no fan-out attempted).
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Returns `true` for errors that only make one source unavailable for
    /// the current round.
    pub fn is_source_failure(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Http(_) | Self::Parse(_))
    }
}

/// Convenience type alias for vidhub-search results.
pub type Result<T> = std::result::Result<T, SearchError>;
