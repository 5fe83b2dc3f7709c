//! Result sink: encoded records out, one per line

use std::time::{Duration, Instant};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::models::NameRecord;
use crate::output::Encoder;
use crate::utils::per_second;

/// Totals of a finished sink
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SinkSummary {
    pub records: u64,
    pub errors: u64,
    pub elapsed: Duration,
}

impl SinkSummary {
    pub fn names_per_second(&self) -> f64 {
        per_second(self.records, self.elapsed)
    }
}

/// Write every result batch received on `results` to `writer`.
///
/// The header (if the format has one) comes first, then one encoded record
/// per line. Records carrying an error are logged as warnings; progress is
/// logged after every batch. Returns when the channel closes.
pub async fn write_results<W>(
    mut results: mpsc::Receiver<Vec<NameRecord>>,
    writer: W,
    encoder: Encoder,
) -> std::io::Result<SinkSummary>
where
    W: AsyncWrite + Unpin,
{
    let started = Instant::now();
    let mut out = BufWriter::new(writer);
    let mut summary = SinkSummary::default();

    let header = encoder.header();
    if !header.is_empty() {
        out.write_all(header.as_bytes()).await?;
        out.write_all(b"\n").await?;
    }

    while let Some(batch) = results.recv().await {
        for record in &batch {
            if let Some(error) = &record.error {
                summary.errors += 1;
                warn!(name = %record.name, error = %error, "Verification error");
            }
            out.write_all(encoder.encode(record).as_bytes()).await?;
            out.write_all(b"\n").await?;
        }
        out.flush().await?;

        summary.records += batch.len() as u64;
        summary.elapsed = started.elapsed();
        info!(
            records = summary.records,
            names_per_second = summary.names_per_second().round() as u64,
            "Verified names"
        );
    }

    out.flush().await?;
    summary.elapsed = started.elapsed();
    Ok(summary)
}
