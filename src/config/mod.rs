//! Configuration management for nameverify
//!
//! A [`Config`] is the frozen snapshot of verification options a process (or a
//! single request) runs with. It is produced by [`ConfigBuilder`], which applies
//! override layers in a fixed order: built-in defaults, then the TOML config
//! file, then `NAMEVERIFY_*` environment variables, then command-line flags.
//!
//! A snapshot is never mutated after construction; request-scoped variants are
//! derived with [`Config::with_layer`].

mod builder;

pub use builder::{parse_bool, parse_data_sources, ConfigBuilder, ConfigLayer, ENV_PREFIX};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::output::OutputFormat;

/// Default location of the Global Names verification API
pub const DEFAULT_VERIFIER_URL: &str = "https://verifier.globalnames.org/api/v1/";

/// Default number of name-strings per batch
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Default number of concurrent verification workers
pub const DEFAULT_JOBS: usize = 4;

/// Default overall timeout of one HTTP request, in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 240;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "nameverify.toml";

/// Errors raised while assembling a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file exists but cannot be read
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`ConfigLayer`]
    #[error("Failed to parse config file {path}: {source}")]
    FileParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value that cannot be recovered with a default
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Verification options snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the verification service, always ending with `/`
    pub verifier_url: String,

    /// Size of the name-string batches fed into the pipeline
    pub batch_size: usize,

    /// Number of verification workers running in parallel
    pub jobs: usize,

    /// Output format of the result encoder
    pub format: OutputFormat,

    /// IDs of data sources the user cares about. Matches from them are
    /// returned in `results` in addition to the best match.
    pub data_sources: Vec<u32>,

    /// Hide the best match and show only preferred results
    pub preferred_only: bool,

    /// Return all matches per data source, not only the best one
    pub with_all_matches: bool,

    /// Capitalize the first letter of a name-string when appropriate
    pub with_capitalization: bool,

    /// Also search for the species group ("Aus bus" also finds "Aus bus bus")
    pub with_species_group: bool,

    /// Relax fuzzy matching rules. Increases recall, decreases precision.
    pub with_relaxed_fuzzy_match: bool,

    /// Allow fuzzy matching of uninomials
    pub with_uninomial_fuzzy_match: bool,

    /// Overall timeout of one HTTP request in seconds
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verifier_url: DEFAULT_VERIFIER_URL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            jobs: DEFAULT_JOBS,
            format: OutputFormat::Csv,
            data_sources: Vec::new(),
            preferred_only: false,
            with_all_matches: false,
            with_capitalization: false,
            with_species_group: false,
            with_relaxed_fuzzy_match: false,
            with_uninomial_fuzzy_match: false,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Validate values that have no safe fallback
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs == 0 {
            return Err(ConfigError::Invalid(
                "jobs must be greater than 0".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        url::Url::parse(&self.verifier_url).map_err(|e| {
            ConfigError::Invalid(format!("verifier_url {}: {e}", self.verifier_url))
        })?;

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Derive a new snapshot with one more override layer applied.
    ///
    /// The receiver is left untouched, so a process-wide snapshot can safely
    /// spawn request-scoped variants.
    #[must_use]
    pub fn with_layer(&self, layer: ConfigLayer) -> Config {
        ConfigBuilder::from_config(self.clone()).layer(layer).into_config()
    }
}

/// Append the trailing slash the endpoint paths are joined onto
pub(crate) fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}
