//! nameverify - streaming client for the Global Names verifier
//!
//! Verifies scientific name-strings in batches against a remote verification
//! service and writes the results as CSV, TSV or JSON.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Layered configuration (defaults, TOML file, environment, flags)
//! - [`client`] - The [`client::Verifier`] capability and its HTTP implementation
//! - [`pipeline`] - Concurrent batch verification with a fixed worker pool
//! - [`io`] - Reading name batches and writing encoded results
//! - [`output`] - CSV/TSV/JSON encoding of verification records
//! - [`models`] - Request and response types shared with the service
//! - [`verifier`] - The [`NameVerifier`] facade tying the pieces together
//! - [`utils`] - Retry policies and request errors
//!
//! # Example
//!
//! ```no_run
//! use nameverify::config::Config;
//! use nameverify::NameVerifier;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let verifier = NameVerifier::new(Config::default())?;
//!     let record = verifier.verify_one("Bubo bubo").await;
//!     println!("{:?}", record.match_type);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod io;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod testing;
pub mod utils;
pub mod verifier;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::client::{RestVerifier, Verifier};
    pub use crate::config::{Config, ConfigBuilder};
    pub use crate::error::{Error, ErrorCategory, Result, VerifierErrorTrait};
    pub use crate::models::{MatchType, NameQuery, NameRecord, SearchInput};
    pub use crate::output::{Encoder, OutputFormat};
    pub use crate::pipeline::Pipeline;
    pub use crate::verifier::NameVerifier;
}

// Direct re-exports for convenience
pub use models::{MatchType, NameRecord};
pub use verifier::NameVerifier;
