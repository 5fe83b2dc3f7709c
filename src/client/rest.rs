//! HTTP implementation of [`Verifier`]
//!
//! One [`reqwest::Client`] (and so one connection pool) is shared by every
//! call. Batch verification is retried according to a [`RetryPolicy`]; when
//! all attempts fail, one error record per name-string is returned instead.

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

use super::Verifier;
use crate::config::{normalize_url, Config, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::models::{
    DataSource, NameQuery, NameRecord, NameStringInput, NameStringOutput, SearchInput,
    SearchOutput, VerifyOutput,
};
use crate::utils::error::RequestError;
use crate::utils::retry::{with_retry, Exhausted, FixedInterval, Retried, RetryPolicy};
use crate::utils::truncate_text;

/// Idle connections kept per host
pub const MAX_IDLE_PER_HOST: usize = 10;

/// How long an idle connection stays in the pool
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest response-body excerpt kept in a status error
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Client of the Global Names verifier REST API
#[derive(Debug, Clone)]
pub struct RestVerifier {
    /// Shared HTTP client with pooled connections
    client: Client,

    /// Base URL, always ending with `/`
    base_url: Url,

    /// Attempt schedule of batch verification
    retry: Arc<dyn RetryPolicy>,
}

impl RestVerifier {
    /// Create a client with the default request timeout
    ///
    /// # Errors
    ///
    /// Returns `RequestError::InvalidUrl` if `base_url` does not parse, or
    /// `RequestError::Http` if the HTTP client cannot be created
    pub fn new(base_url: &str) -> Result<Self, RequestError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    /// Create a client for the URL and timeout of a configuration snapshot
    pub fn from_config(config: &Config) -> Result<Self, RequestError> {
        Self::with_timeout(&config.verifier_url, config.request_timeout())
    }

    /// Create a client with a custom overall request timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, RequestError> {
        let normalized = normalize_url(base_url);
        let base_url = Url::parse(&normalized)
            .map_err(|e| RequestError::InvalidUrl(format!("{normalized}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RequestError::InvalidUrl(normalized));
        }

        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .pool_idle_timeout(IDLE_TIMEOUT)
            .gzip(true)
            .user_agent(concat!("nameverify/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            retry: Arc::new(FixedInterval::default()),
        })
    }

    /// Replace the attempt schedule of batch verification
    pub fn with_retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry = Arc::new(policy);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &dyn RetryPolicy {
        self.retry.as_ref()
    }

    /// Append path segments to the base URL, percent-encoding each of them
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RequestError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RequestError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// One `POST verifications` attempt
    async fn post_verifications(
        &self,
        url: &Url,
        body: &[u8],
    ) -> Result<Vec<NameRecord>, RequestError> {
        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_vec())
            .send()
            .await?;

        let output: VerifyOutput = decode(response).await?;
        Ok(output.names)
    }

    /// Single-attempt GET decoding a JSON body
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, RequestError> {
        debug!(url = %url, "GET");
        let result = match self
            .client
            .get(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
        {
            Ok(response) => decode(response).await,
            Err(e) => Err(e.into()),
        };

        result.inspect_err(|e| error!(url = %url, error = %e, "Request to verifier failed"))
    }
}

/// Check the status and decode the JSON body of a response
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RequestError> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        return Err(RequestError::Status {
            status: status.as_u16(),
            body: truncate_text(&String::from_utf8_lossy(&bytes), MAX_ERROR_BODY_CHARS),
        });
    }

    serde_json::from_slice(&bytes).map_err(|e| RequestError::Decode(e.to_string()))
}

#[async_trait]
impl Verifier for RestVerifier {
    async fn verify(&self, query: &NameQuery) -> Vec<NameRecord> {
        if query.is_empty() {
            return Vec::new();
        }

        let names_range = query.names_range();

        let body = serde_json::to_vec(query).unwrap_or_else(|e| {
            error!(names_range = %names_range, error = %e, "Cannot encode names for verification");
            Vec::new()
        });

        let url = match self.endpoint(&["verifications"]) {
            Ok(url) => url,
            Err(e) => {
                error!(names_range = %names_range, error = %e, "Cannot build verification URL");
                return NameRecord::failed_batch(&query.name_strings, &e.to_string());
            }
        };

        let (url, body, range) = (&url, &body, &names_range);
        let outcome = with_retry(self.retry.as_ref(), |attempt| async move {
            let result = self.post_verifications(url, body).await;
            if let Err(e) = &result {
                warn!(
                    names_range = %range,
                    attempt,
                    timeout = e.is_timeout(),
                    error = %e,
                    "Verification request failed"
                );
            }
            result
        })
        .await;

        match outcome {
            Ok(Retried { value, attempts }) => {
                debug!(
                    names_range = %names_range,
                    attempts,
                    names = value.len(),
                    "Verification succeeded"
                );
                value
            }
            Err(Exhausted {
                last_error,
                attempts,
            }) => {
                warn!(
                    names_range = %names_range,
                    attempts,
                    error = %last_error,
                    "Verification failed"
                );
                NameRecord::failed_batch(&query.name_strings, &last_error.to_string())
            }
        }
    }

    async fn name_string(&self, input: &NameStringInput) -> Result<NameStringOutput, RequestError> {
        let mut url = self.endpoint(&["name_strings", &input.id])?;
        url.set_query(input.query_string().as_deref());
        self.get_json(url).await
    }

    async fn data_sources(&self) -> Result<Vec<DataSource>, RequestError> {
        let url = self.endpoint(&["data_sources"])?;
        self.get_json(url).await
    }

    async fn data_source(&self, id: u32) -> Result<DataSource, RequestError> {
        let url = self.endpoint(&["data_sources", &id.to_string()])?;
        self.get_json(url).await
    }

    async fn search(&self, input: &SearchInput) -> Result<SearchOutput, RequestError> {
        if input.is_empty() {
            return Err(RequestError::InvalidUrl(
                "search needs at least one name facet".to_string(),
            ));
        }
        let url = self.endpoint(&["search", &input.to_query()])?;
        self.get_json(url).await
    }
}
