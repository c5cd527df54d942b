//! Error types for agent-chain.
//!
//! This module provides error types used across the crate for handling
//! failures of model calls, embedding calls and vector store access.

use thiserror::Error;

/// Result type alias for agent-chain operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for agent-chain operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Error from HTTP requests.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error parsing JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error from the backing database.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Missing required configuration.
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// Invalid model or store configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a missing config error.
    pub fn missing_config(key: impl Into<String>) -> Self {
        Self::MissingConfig(key.into())
    }

    /// Create an invalid config error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_invalid_config(&self) -> bool {
        matches!(self, Self::InvalidConfig(_) | Self::MissingConfig(_))
    }
}
