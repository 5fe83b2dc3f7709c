//! Mock verification service for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::fixtures;
use crate::client::Verifier;
use crate::models::{
    DataSource, NameQuery, NameRecord, NameStringInput, NameStringOutput, SearchInput,
    SearchOutput,
};
use crate::utils::error::RequestError;

/// Mock implementation of the Verifier trait.
///
/// Provides controllable behavior for testing:
/// - Canned records per name-string, NoMatch for everything else
/// - Simulated service outage (error records for every name)
/// - Simulated latency
/// - Broken responses that lose a record
/// - Recorded queries and call counts for assertions
#[derive(Debug, Clone, Default)]
pub struct MockVerifier {
    /// Canned records keyed by name-string.
    records: Arc<RwLock<HashMap<String, NameRecord>>>,
    /// Canned records keyed by name-string ID.
    name_strings: Arc<RwLock<HashMap<String, NameRecord>>>,
    /// Data sources served by `data_sources` and `data_source`.
    data_sources: Arc<RwLock<Vec<DataSource>>>,
    /// Records served by `search`.
    search_results: Arc<RwLock<Vec<NameRecord>>>,
    /// Every query passed to `verify`.
    queries: Arc<RwLock<Vec<NameQuery>>>,
    /// Every rendered search query.
    searches: Arc<RwLock<Vec<String>>>,
    /// If set, `verify` returns error records with this message.
    outage: Arc<RwLock<Option<String>>>,
    /// If set, non-batch calls fail with this status.
    unavailable: Arc<RwLock<Option<u16>>>,
    /// Simulated latency of `verify`.
    delay: Arc<RwLock<Duration>>,
    /// Drop the last record of every response.
    truncate: Arc<AtomicBool>,
    /// Number of `verify` calls, including empty queries.
    calls: Arc<AtomicUsize>,
}

impl MockVerifier {
    /// Create a new mock verifier that knows no names.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `record` for its name-string (and for its ID in `name_string`).
    pub async fn add_record(&self, record: NameRecord) {
        self.name_strings
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        self.records
            .write()
            .await
            .insert(record.name.clone(), record);
    }

    /// Set the data sources the mock knows about.
    pub async fn set_data_sources(&self, data_sources: Vec<DataSource>) {
        *self.data_sources.write().await = data_sources;
    }

    /// Set the records returned by every search.
    pub async fn set_search_results(&self, records: Vec<NameRecord>) {
        *self.search_results.write().await = records;
    }

    /// Make every `verify` call fail with the given message.
    pub async fn set_outage(&self, message: impl Into<String>) {
        *self.outage.write().await = Some(message.into());
    }

    /// Restore normal `verify` behavior.
    pub async fn clear_outage(&self) {
        *self.outage.write().await = None;
    }

    /// Make non-batch calls answer with an HTTP status error.
    pub async fn set_unavailable(&self, status: u16) {
        *self.unavailable.write().await = Some(status);
    }

    /// Set the simulated duration of every `verify` call.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Lose the last record of every response, breaking the one record per
    /// name-string contract.
    pub fn set_truncate(&self, truncate: bool) {
        self.truncate.store(truncate, Ordering::SeqCst);
    }

    /// Number of `verify` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Get all recorded queries.
    pub async fn recorded_queries(&self) -> Vec<NameQuery> {
        self.queries.read().await.clone()
    }

    /// Get all recorded search query strings.
    pub async fn recorded_searches(&self) -> Vec<String> {
        self.searches.read().await.clone()
    }

    async fn check_available(&self) -> Result<(), RequestError> {
        match *self.unavailable.read().await {
            Some(status) => Err(RequestError::Status {
                status,
                body: "mock verifier unavailable".to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Verifier for MockVerifier {
    async fn verify(&self, query: &NameQuery) -> Vec<NameRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.write().await.push(query.clone());

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if query.is_empty() {
            return Vec::new();
        }

        if let Some(message) = self.outage.read().await.as_deref() {
            return NameRecord::failed_batch(&query.name_strings, message);
        }

        let known = self.records.read().await;
        let mut records: Vec<NameRecord> = query
            .name_strings
            .iter()
            .map(|name| {
                known
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| fixtures::no_match_record(name))
            })
            .collect();

        if self.truncate.load(Ordering::SeqCst) {
            records.pop();
        }

        records
    }

    async fn name_string(&self, input: &NameStringInput) -> Result<NameStringOutput, RequestError> {
        self.check_available().await?;
        let name = self.name_strings.read().await.get(&input.id).cloned();
        Ok(NameStringOutput { name })
    }

    async fn data_sources(&self) -> Result<Vec<DataSource>, RequestError> {
        self.check_available().await?;
        Ok(self.data_sources.read().await.clone())
    }

    async fn data_source(&self, id: u32) -> Result<DataSource, RequestError> {
        self.check_available().await?;
        self.data_sources
            .read()
            .await
            .iter()
            .find(|ds| ds.id == id)
            .cloned()
            .ok_or_else(|| RequestError::Status {
                status: 404,
                body: format!("data source {id} not found"),
            })
    }

    async fn search(&self, input: &SearchInput) -> Result<SearchOutput, RequestError> {
        self.check_available().await?;
        self.searches.write().await.push(input.to_query());
        Ok(SearchOutput {
            names: self.search_results.read().await.clone(),
        })
    }
}
