//! Error types for the vidhub host.

/// Top-level error type for configuration, start-up and serving.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration could not be parsed or is invalid.
    #[error("config error: {0}")]
    Config(String),

    /// The HTTP server could not start.
    #[error("server error: {0}")]
    Server(String),

    /// Search core error (HTTP client construction, validation).
    #[error(transparent)]
    Search(#[from] vidhub_search::SearchError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AppError>;
