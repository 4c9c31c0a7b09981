//! Error types for the Tollgate client.

use thiserror::Error;

/// Boxed error raised by an underlying transport.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for Tollgate operations.
#[derive(Error, Debug)]
pub enum TollgateError {
    /// Rejected limiter or client configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Malformed request construction
    #[error("Invalid request: {0}")]
    Request(#[from] http::Error),

    /// Failure raised by the underlying transport, passed through unchanged
    #[error("Transport error: {0}")]
    Transport(BoxError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for TollgateError {
    fn from(err: reqwest::Error) -> Self {
        TollgateError::Transport(Box::new(err))
    }
}

/// Result type alias for Tollgate operations.
pub type Result<T> = std::result::Result<T, TollgateError>;
