//! Streaming verification pipeline
//!
//! This module fans batches of name-strings out to a fixed number of workers
//! that call the verification service, and fans the result batches back in.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Batch     │     │   Adapter   │     │  Verifier   │     │   Result    │
//! │   Source    │────▶│ (NameQuery) │────▶│ Workers x J │────▶│    Sink     │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!             mpsc(1)             mpsc(1)             mpsc(1)
//! ```
//!
//! Every channel holds at most one item, so a slow sink or service throttles
//! the whole chain. Batches come out in completion order; records inside a
//! batch keep their input order.

mod pool;
mod stream;

pub use pool::{PoolHandle, TaskPool};
pub use stream::{Pipeline, CHANNEL_CAPACITY};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::models::NameRecord;

/// Fatal conditions that abort a pipeline run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The verifier returned a different number of records than it was given
    /// name-strings
    #[error("Verifier returned {got} records for {expected} names ({names_range})")]
    CardinalityMismatch {
        names_range: String,
        expected: usize,
        got: usize,
    },

    /// Nobody is reading the output channel any more
    #[error("Output channel closed before the run finished")]
    OutputClosed,

    /// A worker task panicked or was aborted
    #[error("Pipeline task failed: {0}")]
    TaskFailed(String),
}

/// Pipeline statistics (thread-safe)
#[derive(Debug)]
pub struct PipelineStats {
    started: Instant,

    /// Batches read from the input channel
    pub batches_in: AtomicU64,

    /// Name-strings read from the input channel
    pub names_in: AtomicU64,

    /// Result batches forwarded to the output channel
    pub batches_out: AtomicU64,

    /// Records forwarded to the output channel
    pub names_out: AtomicU64,

    /// Records carrying an error
    pub failed_names: AtomicU64,

    /// Empty batches dropped without a remote call
    pub empty_batches: AtomicU64,
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self {
            started: Instant::now(),
            batches_in: AtomicU64::new(0),
            names_in: AtomicU64::new(0),
            batches_out: AtomicU64::new(0),
            names_out: AtomicU64::new(0),
            failed_names: AtomicU64::new(0),
            empty_batches: AtomicU64::new(0),
        }
    }
}

impl PipelineStats {
    /// Create new stats counter
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record a batch taken from the input
    pub fn record_input(&self, names: usize) {
        self.batches_in.fetch_add(1, Ordering::Relaxed);
        self.names_in.fetch_add(names as u64, Ordering::Relaxed);
    }

    /// Record a result batch handed to the output
    pub fn record_output(&self, records: &[NameRecord]) {
        let failed = records.iter().filter(|r| r.has_error()).count();
        self.batches_out.fetch_add(1, Ordering::Relaxed);
        self.names_out
            .fetch_add(records.len() as u64, Ordering::Relaxed);
        self.failed_names.fetch_add(failed as u64, Ordering::Relaxed);
    }

    /// Record an empty batch dropped by a worker
    pub fn record_empty(&self) {
        self.empty_batches.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current stats
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            batches_in: self.batches_in.load(Ordering::Relaxed),
            names_in: self.names_in.load(Ordering::Relaxed),
            batches_out: self.batches_out.load(Ordering::Relaxed),
            names_out: self.names_out.load(Ordering::Relaxed),
            failed_names: self.failed_names.load(Ordering::Relaxed),
            empty_batches: self.empty_batches.load(Ordering::Relaxed),
            elapsed: self.started.elapsed(),
        }
    }
}

/// Snapshot of pipeline statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsSnapshot {
    pub batches_in: u64,
    pub names_in: u64,
    pub batches_out: u64,
    pub names_out: u64,
    pub failed_names: u64,
    pub empty_batches: u64,
    pub elapsed: Duration,
}

impl StatsSnapshot {
    /// Share of verified names that came back without an error (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.names_out == 0 {
            return 1.0;
        }
        (self.names_out - self.failed_names) as f64 / self.names_out as f64
    }

    /// Verified names per second
    pub fn names_per_second(&self) -> f64 {
        crate::utils::per_second(self.names_out, self.elapsed)
    }
}
