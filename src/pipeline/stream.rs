//! Stream coordinator: batches in, result batches out

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{PipelineError, PipelineStats, StatsSnapshot, TaskPool};
use crate::client::Verifier;
use crate::config::Config;
use crate::models::{NameQuery, NameRecord};

/// Capacity of every pipeline channel
pub const CHANNEL_CAPACITY: usize = 1;

/// Verification pipeline bound to one verifier and one configuration snapshot
#[derive(Clone)]
pub struct Pipeline {
    verifier: Arc<dyn Verifier>,
    config: Arc<Config>,
    stats: Arc<PipelineStats>,
}

impl Pipeline {
    pub fn new(verifier: Arc<dyn Verifier>, config: Arc<Config>) -> Self {
        Self {
            verifier,
            config,
            stats: PipelineStats::new(),
        }
    }

    /// Current statistics of this pipeline
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Verify every batch received on `input` and send the results to `output`.
    ///
    /// Returns once the input is exhausted (or the run is cancelled) and every
    /// worker has exited; `output` is closed at that point. Each output batch
    /// has exactly as many records as its input batch, in the same order.
    /// Empty batches are dropped.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::CardinalityMismatch` if the verifier breaks the
    /// one record per name-string contract, and `PipelineError::OutputClosed`
    /// if the output receiver goes away. Both cancel the run.
    pub async fn run(
        &self,
        input: mpsc::Receiver<Vec<String>>,
        output: mpsc::Sender<Vec<NameRecord>>,
        cancel: CancellationToken,
    ) -> Result<StatsSnapshot, PipelineError> {
        let pool = TaskPool::new(self.config.jobs);
        info!(
            jobs = pool.workers(),
            batch_size = self.config.batch_size,
            verifier_url = %self.config.verifier_url,
            "Starting verification pipeline"
        );

        let (query_tx, query_rx) = mpsc::channel::<NameQuery>(CHANNEL_CAPACITY);

        let adapter = tokio::spawn(load_queries(
            input,
            query_tx,
            Arc::clone(&self.config),
            Arc::clone(&self.stats),
            cancel.clone(),
        ));

        let verifier = Arc::clone(&self.verifier);
        let stats = Arc::clone(&self.stats);
        let workers = pool.spawn(query_rx, output, cancel, move |worker_id, query| {
            let verifier = Arc::clone(&verifier);
            let stats = Arc::clone(&stats);
            async move { verify_query(worker_id, verifier.as_ref(), &stats, query).await }
        });

        let adapter_result = adapter
            .await
            .map_err(|e| PipelineError::TaskFailed(e.to_string()));
        workers.join().await?;
        adapter_result?;

        let snapshot = self.stats.snapshot();
        info!(
            batches = snapshot.batches_out,
            names = snapshot.names_out,
            failed = snapshot.failed_names,
            empty_batches = snapshot.empty_batches,
            names_per_second = snapshot.names_per_second().round() as u64,
            "Pipeline completed"
        );

        Ok(snapshot)
    }
}

/// Turn raw batches into queries carrying the run's options
async fn load_queries(
    mut input: mpsc::Receiver<Vec<String>>,
    queries: mpsc::Sender<NameQuery>,
    config: Arc<Config>,
    stats: Arc<PipelineStats>,
    cancel: CancellationToken,
) {
    loop {
        let batch = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            batch = input.recv() => batch,
        };

        let Some(batch) = batch else {
            break; // Input exhausted
        };
        stats.record_input(batch.len());

        let query = NameQuery::new(batch, &config);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = queries.send(query) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }

    debug!("Query adapter shutting down");
}

/// Worker body: one remote call per non-empty query
async fn verify_query(
    worker_id: usize,
    verifier: &dyn Verifier,
    stats: &PipelineStats,
    query: NameQuery,
) -> Result<Option<Vec<NameRecord>>, PipelineError> {
    if query.is_empty() {
        stats.record_empty();
        debug!(worker_id, "Dropping empty batch");
        return Ok(None);
    }

    let records = verifier.verify(&query).await;
    if records.len() != query.len() {
        return Err(PipelineError::CardinalityMismatch {
            names_range: query.names_range(),
            expected: query.len(),
            got: records.len(),
        });
    }

    debug!(
        worker_id,
        names_range = %query.names_range(),
        names = records.len(),
        "Batch verified"
    );
    stats.record_output(&records);
    Ok(Some(records))
}
