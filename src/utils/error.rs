//! Error types for calls to the verification service

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to the verification service
#[derive(Error, Debug)]
pub enum RequestError {
    /// Transport-level failure (connection, TLS, timeout inside reqwest)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body is not the expected JSON shape
    #[error("Cannot decode response: {0}")]
    Decode(String),

    /// Overall deadline of a call elapsed
    #[error("Deadline of {0:?} exceeded")]
    Deadline(Duration),

    /// Endpoint URL cannot be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl RequestError {
    /// HTTP status code, if the service answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the call failed because a timer ran out
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout(),
            Self::Deadline(_) => true,
            _ => false,
        }
    }
}
