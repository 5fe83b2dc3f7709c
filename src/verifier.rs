//! High-level entry point tying the configuration, the remote client and the
//! pipeline together

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::client::{RestVerifier, Verifier};
use crate::config::{Config, ConfigLayer};
use crate::error::Result;
use crate::models::{DataSource, NameQuery, NameRecord, NameStringInput, SearchInput};
use crate::pipeline::{Pipeline, PipelineError, StatsSnapshot};
use crate::utils::error::RequestError;

/// Overall deadline of [`NameVerifier::verify_batch`]
pub const BATCH_DEADLINE: Duration = Duration::from_secs(20);

/// Verification of name-strings with one configuration snapshot
#[derive(Clone)]
pub struct NameVerifier {
    config: Arc<Config>,
    verifier: Arc<dyn Verifier>,
}

impl NameVerifier {
    /// Validate `config` and connect to the service it points at
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let verifier = RestVerifier::from_config(&config)?;
        Ok(Self::with_verifier(config, Arc::new(verifier)))
    }

    /// Use an already constructed verifier (a mock in tests)
    pub fn with_verifier(config: Config, verifier: Arc<dyn Verifier>) -> Self {
        Self {
            config: Arc::new(config),
            verifier,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Derive a verifier with one more override layer applied.
    ///
    /// The HTTP client is shared with `self`, so URL and timeout overrides of
    /// the layer only show up in [`NameVerifier::config`].
    #[must_use]
    pub fn with_config(&self, layer: ConfigLayer) -> Self {
        Self {
            config: Arc::new(self.config.with_layer(layer)),
            verifier: Arc::clone(&self.verifier),
        }
    }

    /// Version of this crate
    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Verify a single name-string
    pub async fn verify_one(&self, name: &str) -> NameRecord {
        self.verify_batch(vec![name.to_string()])
            .await
            .into_iter()
            .next()
            .unwrap_or_else(|| NameRecord::failed(name, "verifier returned no result"))
    }

    /// Verify a small batch in one call, giving up after [`BATCH_DEADLINE`].
    ///
    /// Always returns one record per name-string; names that could not be
    /// verified in time carry a deadline error.
    pub async fn verify_batch(&self, names: Vec<String>) -> Vec<NameRecord> {
        let query = NameQuery::new(names, &self.config);
        match tokio::time::timeout(BATCH_DEADLINE, self.verifier.verify(&query)).await {
            Ok(records) => records,
            Err(_) => {
                let err = RequestError::Deadline(BATCH_DEADLINE);
                warn!(names_range = %query.names_range(), error = %err, "Verification failed");
                NameRecord::failed_batch(&query.name_strings, &err.to_string())
            }
        }
    }

    /// Run the streaming pipeline over `input`, sending results to `output`
    pub async fn verify_stream(
        &self,
        input: mpsc::Receiver<Vec<String>>,
        output: mpsc::Sender<Vec<NameRecord>>,
        cancel: CancellationToken,
    ) -> std::result::Result<StatsSnapshot, PipelineError> {
        Pipeline::new(Arc::clone(&self.verifier), Arc::clone(&self.config))
            .run(input, output, cancel)
            .await
    }

    /// Faceted search
    pub async fn search(
        &self,
        input: &SearchInput,
    ) -> std::result::Result<Vec<NameRecord>, RequestError> {
        Ok(self.verifier.search(input).await?.names)
    }

    /// Metadata of all aggregated data sources
    pub async fn data_sources(&self) -> std::result::Result<Vec<DataSource>, RequestError> {
        self.verifier.data_sources().await
    }

    /// Metadata of one data source
    pub async fn data_source(&self, id: u32) -> std::result::Result<DataSource, RequestError> {
        self.verifier.data_source(id).await
    }

    /// Look up a name-string by its identifier, using the data-source filter
    /// and all-matches flag of the configuration
    pub async fn name_string(
        &self,
        id: &str,
    ) -> std::result::Result<Option<NameRecord>, RequestError> {
        let input = NameStringInput {
            id: id.to_string(),
            data_sources: self.config.data_sources.clone(),
            with_all_matches: self.config.with_all_matches,
        };
        Ok(self.verifier.name_string(&input).await?.name)
    }
}
