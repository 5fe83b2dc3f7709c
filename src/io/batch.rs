//! Batch source: newline-delimited name-strings in, fixed-size batches out

use std::borrow::Cow;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Read newline-delimited name-strings and send them in batches of
/// `batch_size`.
///
/// Lines are trimmed; empty lines are kept so that output rows line up with
/// input lines. Bytes that are not valid UTF-8 are replaced with U+FFFD and
/// the line is still sent. The last batch is sent even when it is short or
/// empty. Returns the number of name-strings sent. Stops early, without sending the
/// pending batch, when the run is cancelled or the receiver goes away.
pub async fn read_batches<R>(
    mut reader: R,
    batch_size: usize,
    batches: mpsc::Sender<Vec<String>>,
    cancel: CancellationToken,
) -> std::io::Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let batch_size = batch_size.max(1);
    let mut buf = Vec::new();
    let mut line_no = 0u64;
    let mut batch = Vec::with_capacity(batch_size);
    let mut sent = 0u64;

    loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(sent),
            read = reader.read_until(b'\n', &mut buf) => read?,
        };
        if read == 0 {
            break;
        }
        line_no += 1;

        let line = String::from_utf8_lossy(&buf);
        if let Cow::Owned(_) = line {
            warn!(line = line_no, "Name-string is not valid UTF-8, replacing bad bytes");
        }
        batch.push(line.trim().to_string());

        if batch.len() == batch_size {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
            let count = full.len() as u64;
            if !send(&batches, full, &cancel).await {
                return Ok(sent);
            }
            sent += count;
        }
    }

    let count = batch.len() as u64;
    if send(&batches, batch, &cancel).await {
        sent += count;
    }
    debug!(names = sent, "Input exhausted");
    Ok(sent)
}

async fn send(
    batches: &mpsc::Sender<Vec<String>>,
    batch: Vec<String>,
    cancel: &CancellationToken,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = batches.send(batch) => sent.is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(input: &'static str, batch_size: usize) -> (Vec<Vec<String>>, u64) {
        let (tx, mut rx) = mpsc::channel(1);
        let reader = tokio::spawn(read_batches(
            input.as_bytes(),
            batch_size,
            tx,
            CancellationToken::new(),
        ));

        let mut batches = Vec::new();
        while let Some(batch) = rx.recv().await {
            batches.push(batch);
        }
        (batches, reader.await.unwrap().unwrap())
    }

    #[tokio::test]
    async fn test_batches_and_trimming() {
        let (batches, sent) = collect("  Aus bus \nCus dus\n\nEus\n", 2).await;

        assert_eq!(
            batches,
            vec![
                vec!["Aus bus".to_string(), "Cus dus".to_string()],
                vec![String::new(), "Eus".to_string()],
                vec![],
            ]
        );
        assert_eq!(sent, 4);
    }

    #[tokio::test]
    async fn test_partial_final_batch() {
        let (batches, sent) = collect("Aus\nBus\nCus", 2).await;
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1], vec!["Cus".to_string()]);
        assert_eq!(sent, 3);
    }

    #[tokio::test]
    async fn test_empty_input_sends_empty_batch() {
        let (batches, sent) = collect("", 10).await;
        assert_eq!(batches, vec![Vec::<String>::new()]);
        assert_eq!(sent, 0);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_kept() {
        let (tx, mut rx) = mpsc::channel(1);
        let input: &'static [u8] = b"Aus bus\nAbies Linn\xe9\r\nCus dus\n";
        let reader = tokio::spawn(read_batches(input, 10, tx, CancellationToken::new()));

        let mut batches = Vec::new();
        while let Some(batch) = rx.recv().await {
            batches.push(batch);
        }

        assert_eq!(reader.await.unwrap().unwrap(), 3);
        assert_eq!(
            batches,
            vec![vec![
                "Aus bus".to_string(),
                "Abies Linn\u{FFFD}".to_string(),
                "Cus dus".to_string(),
            ]]
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let (tx, mut rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let sent = read_batches("Aus\nBus\n".as_bytes(), 1, tx, cancel)
            .await
            .unwrap();
        assert_eq!(sent, 0);
        assert!(rx.recv().await.is_none());
    }
}
