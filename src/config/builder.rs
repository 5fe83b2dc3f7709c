//! Layered construction of [`Config`] snapshots

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use super::{normalize_url, Config, ConfigError};
use crate::output::OutputFormat;

/// Prefix of every environment variable the builder reads
pub const ENV_PREFIX: &str = "NAMEVERIFY_";

/// One override layer. `None` leaves the value of earlier layers in place.
///
/// The same shape is deserialized from the TOML config file, read from the
/// environment, and filled from command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub verifier_url: Option<String>,
    pub batch_size: Option<usize>,
    pub jobs: Option<usize>,
    pub format: Option<String>,
    pub data_sources: Option<Vec<u32>>,
    pub preferred_only: Option<bool>,
    pub with_all_matches: Option<bool>,
    pub with_capitalization: Option<bool>,
    pub with_species_group: Option<bool>,
    pub with_relaxed_fuzzy_match: Option<bool>,
    pub with_uninomial_fuzzy_match: Option<bool>,
    pub request_timeout_secs: Option<u64>,
}

/// Builder applying override layers on top of the defaults
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from built-in defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Apply one override layer
    pub fn layer(mut self, layer: ConfigLayer) -> Self {
        let c = &mut self.config;

        if let Some(url) = layer.verifier_url.filter(|u| !u.trim().is_empty()) {
            c.verifier_url = normalize_url(&url);
        }
        if let Some(batch_size) = layer.batch_size {
            c.batch_size = batch_size;
        }
        if let Some(jobs) = layer.jobs {
            c.jobs = jobs;
        }
        if let Some(format) = layer.format {
            c.format = OutputFormat::parse_or_default(&format);
        }
        if let Some(data_sources) = layer.data_sources {
            c.data_sources = data_sources;
        }
        if let Some(v) = layer.preferred_only {
            c.preferred_only = v;
        }
        if let Some(v) = layer.with_all_matches {
            c.with_all_matches = v;
        }
        if let Some(v) = layer.with_capitalization {
            c.with_capitalization = v;
        }
        if let Some(v) = layer.with_species_group {
            c.with_species_group = v;
        }
        if let Some(v) = layer.with_relaxed_fuzzy_match {
            c.with_relaxed_fuzzy_match = v;
        }
        if let Some(v) = layer.with_uninomial_fuzzy_match {
            c.with_uninomial_fuzzy_match = v;
        }
        if let Some(v) = layer.request_timeout_secs {
            c.request_timeout_secs = v;
        }

        self
    }

    /// Apply the layer stored in a TOML config file
    pub fn file(self, path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let layer: ConfigLayer =
            toml::from_str(&content).map_err(|source| ConfigError::FileParse {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(path = %path.display(), "Using config file");
        Ok(self.layer(layer))
    }

    /// Apply a TOML config file if it exists; a missing file is not an error
    pub fn file_if_exists(self, path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            self.file(path)
        } else {
            debug!(path = %path.display(), "Config file not found, skipping");
            Ok(self)
        }
    }

    /// Apply `NAMEVERIFY_*` variables from the process environment
    pub fn env(self) -> Self {
        self.env_from(|key| std::env::var(key).ok())
    }

    /// Apply `NAMEVERIFY_*` variables resolved through `lookup`
    pub fn env_from<F>(self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        let layer = ConfigLayer {
            verifier_url: var("VERIFIER_URL"),
            batch_size: var("BATCH_SIZE").and_then(|v| parse_env_number("BATCH_SIZE", &v)),
            jobs: var("JOBS").and_then(|v| parse_env_number("JOBS", &v)),
            format: var("FORMAT"),
            data_sources: var("DATA_SOURCES").and_then(|v| parse_data_sources(&v)),
            preferred_only: var("PREFERRED_ONLY").and_then(|v| parse_env_bool("PREFERRED_ONLY", &v)),
            with_all_matches: var("WITH_ALL_MATCHES")
                .and_then(|v| parse_env_bool("WITH_ALL_MATCHES", &v)),
            with_capitalization: var("WITH_CAPITALIZATION")
                .and_then(|v| parse_env_bool("WITH_CAPITALIZATION", &v)),
            with_species_group: var("WITH_SPECIES_GROUP")
                .and_then(|v| parse_env_bool("WITH_SPECIES_GROUP", &v)),
            with_relaxed_fuzzy_match: var("WITH_RELAXED_FUZZY_MATCH")
                .and_then(|v| parse_env_bool("WITH_RELAXED_FUZZY_MATCH", &v)),
            with_uninomial_fuzzy_match: var("WITH_UNINOMIAL_FUZZY_MATCH")
                .and_then(|v| parse_env_bool("WITH_UNINOMIAL_FUZZY_MATCH", &v)),
            request_timeout_secs: var("REQUEST_TIMEOUT")
                .and_then(|v| parse_env_number("REQUEST_TIMEOUT", &v)),
        };

        self.layer(layer)
    }

    /// Freeze and validate the configuration
    pub fn build(self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }

    pub(super) fn into_config(self) -> Config {
        self.config
    }
}

/// Parse a comma-separated list of data-source IDs such as `"1, 11"`.
///
/// A malformed entry makes the whole list unusable: a warning is logged and
/// `None` is returned so earlier layers stay in effect. IDs below 1 are
/// skipped with a warning.
pub fn parse_data_sources(s: &str) -> Option<Vec<u32>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let mut ids = Vec::new();
    for item in s.split(',') {
        let item = item.trim();
        match item.parse::<i64>() {
            Ok(id) if id >= 1 && id <= i64::from(u32::MAX) => ids.push(id as u32),
            Ok(id) => warn!(data_source = id, "Data source ID is out of range, skipping"),
            Err(_) => {
                warn!(
                    data_source = item,
                    "Cannot convert data-source to a list of IDs, ignoring data sources"
                );
                return None;
            }
        }
    }

    (!ids.is_empty()).then_some(ids)
}

/// Parse a boolean setting (`true/false`, `1/0`, `yes/no`, `on/off`)
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "t" => Some(true),
        "false" | "0" | "no" | "off" | "f" => Some(false),
        _ => None,
    }
}

fn parse_env_bool(name: &str, value: &str) -> Option<bool> {
    let parsed = parse_bool(value);
    if parsed.is_none() {
        warn!(variable = %format!("{ENV_PREFIX}{name}"), value, "Ignoring non-boolean value");
    }
    parsed
}

fn parse_env_number<T: std::str::FromStr>(name: &str, value: &str) -> Option<T> {
    let parsed = value.trim().parse::<T>().ok();
    if parsed.is_none() {
        warn!(variable = %format!("{ENV_PREFIX}{name}"), value, "Ignoring non-numeric value");
    }
    parsed
}
