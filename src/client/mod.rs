//! Access to the remote verification service
//!
//! [`Verifier`] is the capability the pipeline and the facade depend on.
//! [`RestVerifier`] talks to the real HTTP API; tests use
//! [`crate::testing::MockVerifier`].

mod rest;

pub use rest::{RestVerifier, IDLE_TIMEOUT, MAX_IDLE_PER_HOST};

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{
    DataSource, NameQuery, NameRecord, NameStringInput, NameStringOutput, SearchInput,
    SearchOutput,
};
use crate::utils::error::RequestError;

/// Operations offered by a name verification service
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Verify a batch of name-strings.
    ///
    /// Never fails: the result has exactly one record per name-string of a
    /// non-empty query, with `error` set on the records that could not be
    /// verified. An empty query yields an empty vector.
    async fn verify(&self, query: &NameQuery) -> Vec<NameRecord>;

    /// Look up a previously verified name-string by its identifier
    async fn name_string(&self, input: &NameStringInput) -> Result<NameStringOutput, RequestError>;

    /// Metadata of all aggregated data sources
    async fn data_sources(&self) -> Result<Vec<DataSource>, RequestError>;

    /// Metadata of one data source
    async fn data_source(&self, id: u32) -> Result<DataSource, RequestError>;

    /// Faceted search
    async fn search(&self, input: &SearchInput) -> Result<SearchOutput, RequestError>;
}

#[async_trait]
impl<V: Verifier + ?Sized> Verifier for Arc<V> {
    async fn verify(&self, query: &NameQuery) -> Vec<NameRecord> {
        (**self).verify(query).await
    }

    async fn name_string(&self, input: &NameStringInput) -> Result<NameStringOutput, RequestError> {
        (**self).name_string(input).await
    }

    async fn data_sources(&self) -> Result<Vec<DataSource>, RequestError> {
        (**self).data_sources().await
    }

    async fn data_source(&self, id: u32) -> Result<DataSource, RequestError> {
        (**self).data_source(id).await
    }

    async fn search(&self, input: &SearchInput) -> Result<SearchOutput, RequestError> {
        (**self).search(input).await
    }
}
