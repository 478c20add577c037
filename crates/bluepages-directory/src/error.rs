//! Error types for directory lookup operations.

use thiserror::Error;

/// Main error type for directory lookup operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The directory server could not be reached or refused the session at
    /// connect or bind time.
    #[error("Directory connection failed: {0}")]
    Connection(String),

    /// The search request failed at the protocol layer, including operation
    /// timeouts.
    #[error("Directory search failed: {0}")]
    Search(String),

    /// The search succeeded but produced no usable result.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error (invalid endpoint URL, unusable TLS material).
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Specialized result type for directory lookup operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Connection(_) => "CONNECTION_ERROR",
            Self::Search(_) => "SEARCH_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Config(_))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::Config(err.to_string())
    }
}
