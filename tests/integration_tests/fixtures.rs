//! Shared fixtures for the integration tests

use nameverify::config::Config;
use nameverify::models::NameRecord;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Input file with a header-free list of names, one blank line included
pub const NAMES_FILE: &str = "Plantago major L.\nNotARealName123\n\nBubo bubo\nPomatomus saltatrix\n";

/// Config with the given concurrency and batch size
pub fn config(jobs: usize, batch_size: usize) -> Config {
    Config {
        jobs,
        batch_size,
        ..Default::default()
    }
}

/// Send every batch, then close the channel
pub fn feed(batches: Vec<Vec<String>>) -> (mpsc::Receiver<Vec<String>>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(1);
    let handle = tokio::spawn(async move {
        for batch in batches {
            if tx.send(batch).await.is_err() {
                break;
            }
        }
    });
    (rx, handle)
}

/// Collect every output batch until the channel closes
pub fn collect() -> (mpsc::Sender<Vec<NameRecord>>, JoinHandle<Vec<Vec<NameRecord>>>) {
    let (tx, mut rx) = mpsc::channel(1);
    let handle = tokio::spawn(async move {
        let mut batches = Vec::new();
        while let Some(batch) = rx.recv().await {
            batches.push(batch);
        }
        batches
    });
    (tx, handle)
}
