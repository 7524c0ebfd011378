//! Error types for gread-feed.
//!
//! Page fetchers report failures through [`Error`]; the synchronizer records
//! them in its `last_error` slot instead of propagating them.

use thiserror::Error;

/// Result type alias for gread-feed operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for gread-feed.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure (connect, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body was not the JSON shape we expected
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The server answered with a non-success status
    #[error("server returned HTTP {status} for {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Request URL
        url: String,
    },

    /// An authenticated endpoint was called without a token
    #[error("authentication token not found")]
    Unauthenticated,

    /// An activity update with no visible text
    #[error("update cannot be empty")]
    EmptyUpdate,

    /// Invalid configuration value
    #[error("configuration error: {message}")]
    Config {
        /// Which setting was rejected, and why
        message: String,
    },

    /// I/O error (config file, log file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}
