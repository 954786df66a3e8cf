// src/error.rs
//! Application error types with structured error handling.
//!
//! Error types form the vocabulary for failure modes in the system.
//! The catalog core only distinguishes one family of failures, a remote
//! call that was rejected or answered with something unusable, and
//! [`AppError::is_network_or_server`] is how callers ask for it.

use thiserror::Error;

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Invalid catalog base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("Catalog service returned HTTP {status}: {message}")]
    Service {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A page stayed unavailable after its retry; carries the message the
    /// view surfaced.
    #[error("Page could not be loaded: {0}")]
    PageUnavailable(String),

    #[error(transparent)]
    Validation(#[from] crate::types::ValidationError),

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl AppError {
    /// Whether the remote call failed: rejected in transport, refused by the
    /// server, or answered with a payload that could not be read.
    pub fn is_network_or_server(&self) -> bool {
        matches!(
            self,
            Self::NetworkFailure(_)
                | Self::Service { .. }
                | Self::MalformedResponse(_)
                | Self::PageUnavailable(_)
        )
    }

    /// Builds a service error from a status code and a body preview.
    pub fn service(status: reqwest::StatusCode, body: &str) -> Self {
        Self::Service {
            status,
            message: crate::api::parser::preview(body),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError {
            message: "Background fetch task did not complete".to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;
