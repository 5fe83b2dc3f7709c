use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use nameverify::config::Config;
use nameverify::io::{read_batches, write_results, Input};
use nameverify::output::Encoder;
use nameverify::pipeline::CHANNEL_CAPACITY;
use nameverify::NameVerifier;

pub async fn verify(config: Config, input: Input) -> Result<()> {
    let verifier = NameVerifier::new(config).context("Failed to create verifier")?;
    let encoder = Encoder::from_config(verifier.config());

    match input {
        Input::Name(name) => verify_one(&verifier, encoder, &name).await,
        Input::File(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            tracing::info!(path = %path.display(), "Verifying names from file");
            verify_stream(&verifier, encoder, BufReader::new(file)).await
        }
        Input::Stdin => {
            tracing::info!("Verifying names from stdin");
            verify_stream(&verifier, encoder, BufReader::new(tokio::io::stdin())).await
        }
    }
}

async fn verify_one(verifier: &NameVerifier, encoder: Encoder, name: &str) -> Result<()> {
    let record = verifier.verify_one(name).await;
    if let Some(error) = &record.error {
        tracing::warn!(name = %record.name, error = %error, "Verification error");
    }

    let mut out = String::new();
    let header = encoder.header();
    if !header.is_empty() {
        out.push_str(&header);
        out.push('\n');
    }
    out.push_str(&encoder.encode(&record));
    out.push('\n');

    let mut stdout = tokio::io::stdout();
    stdout.write_all(out.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

/// Batch source -> pipeline -> sink, interrupted gracefully by Ctrl-C
async fn verify_stream<R>(verifier: &NameVerifier, encoder: Encoder, reader: R) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let cancel = CancellationToken::new();

    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, finishing batches in flight");
                cancel.cancel();
            }
        }
    });

    let (batch_tx, batch_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (result_tx, result_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let source = tokio::spawn(read_batches(
        reader,
        verifier.config().batch_size,
        batch_tx,
        cancel.clone(),
    ));
    let sink = tokio::spawn(write_results(result_rx, tokio::io::stdout(), encoder));

    let run = verifier.verify_stream(batch_rx, result_tx, cancel.clone()).await;
    interrupt.abort();

    let summary = sink.await.context("Sink task failed")??;
    let names_read = source.await.context("Batch source task failed")??;
    let stats = run.context("Verification aborted")?;

    tracing::info!(
        names_read,
        records = summary.records,
        errors = summary.errors,
        empty_batches = stats.empty_batches,
        names_per_second = summary.names_per_second().round() as u64,
        "Verification finished"
    );

    if cancel.is_cancelled() {
        anyhow::bail!("Verification interrupted");
    }
    Ok(())
}
