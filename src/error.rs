//! Error handling and custom error types
//!
//! Provides unified error handling across the service using thiserror. Each
//! variant maps onto one HTTP status class so the server layer never has to
//! inspect messages.

use axum::http::StatusCode;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    InvalidInput(String),

    #[error("AI provider rejected the request: {0}")]
    UpstreamRejected(String),

    #[error("AI provider rate limit reached: {0}")]
    RateLimited(String),

    #[error("AI provider error: {0}")]
    AiProvider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

impl Error {
    /// HTTP status reported to callers for this failure class.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidInput(_) | Error::UpstreamRejected(_) => StatusCode::BAD_REQUEST,
            Error::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Classify a non-success provider status into the matching variant.
    pub fn from_provider_status(provider: &str, status: reqwest::StatusCode, body: &str) -> Self {
        let message = format!("{} API error (status {}): {}", provider, status, body);
        match status.as_u16() {
            400 | 413 | 415 | 422 => Error::UpstreamRejected(message),
            429 => Error::RateLimited(message),
            _ => Error::AiProvider(message),
        }
    }

    /// Recover an owned error from one shared between coalesced cache waiters.
    ///
    /// The failure class is preserved; wrapped library errors keep only their
    /// message.
    pub fn from_shared(shared: Arc<Error>) -> Self {
        Arc::try_unwrap(shared).unwrap_or_else(|shared| match shared.as_ref() {
            Error::InvalidInput(m) => Error::InvalidInput(m.clone()),
            Error::UpstreamRejected(m) => Error::UpstreamRejected(m.clone()),
            Error::RateLimited(m) => Error::RateLimited(m.clone()),
            Error::AiProvider(m) => Error::AiProvider(m.clone()),
            Error::Config(m) => Error::Config(m.clone()),
            Error::Invariant(m) => Error::Invariant(m.clone()),
            other @ (Error::Io(_) | Error::Serialization(_) | Error::Http(_)) => {
                Error::AiProvider(other.to_string())
            }
        })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
