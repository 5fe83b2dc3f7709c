//! Unified error handling for the nameverify crate
//!
//! Each concern keeps its own error type; [`Error`] wraps them so callers that
//! cross module boundaries can use one type.
//!
//! - [`VerifierErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use nameverify::error::{Error, VerifierErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         eprintln!("Try again later: {err}");
//!     } else {
//!         eprintln!("Fatal error: {err}");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::config::ConfigError;
pub use crate::pipeline::PipelineError;
pub use crate::utils::error::RequestError;

/// Common trait for all nameverify error types
pub trait VerifierErrorTrait: std::error::Error {
    /// Check if this error is recoverable (the same call may succeed later)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Transport failures, timeouts, unexpected status codes
    Network,
    /// Response bodies that do not decode
    Decoding,
    /// Reading input or writing output
    Io,
    /// Configuration and validation errors
    Config,
    /// Broken invariants inside a pipeline run
    Pipeline,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Decoding => "decoding",
            Self::Io => "io",
            Self::Config => "config",
            Self::Pipeline => "pipeline",
            Self::Other => "other",
        }
    }
}

impl VerifierErrorTrait for RequestError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidUrl(_) => false,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Http(_) | Self::Decode(_) | Self::Deadline(_) => true,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Decode(_) => ErrorCategory::Decoding,
            Self::InvalidUrl(_) => ErrorCategory::Config,
            Self::Http(_) | Self::Status { .. } | Self::Deadline(_) => ErrorCategory::Network,
        }
    }
}

impl VerifierErrorTrait for ConfigError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::FileRead { .. } => ErrorCategory::Io,
            Self::FileParse { .. } | Self::Invalid(_) => ErrorCategory::Config,
        }
    }
}

impl VerifierErrorTrait for PipelineError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Pipeline
    }
}

/// Unified error type for the nameverify crate
#[derive(Error, Debug)]
pub enum Error {
    /// Calls to the verification service
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Configuration loading and validation
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline run aborted
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl VerifierErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Request(e) => e.is_recoverable(),
            Self::Config(e) => e.is_recoverable(),
            Self::Pipeline(e) => e.is_recoverable(),
            Self::Io(_) => true, // I/O errors are often transient
            Self::Json(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Request(e) => e.category(),
            Self::Config(e) => e.category(),
            Self::Pipeline(e) => e.category(),
            Self::Io(_) => ErrorCategory::Io,
            Self::Json(_) => ErrorCategory::Decoding,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
