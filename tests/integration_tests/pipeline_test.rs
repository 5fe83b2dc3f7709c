//! Streaming pipeline integration tests
//!
//! Tests the complete workflow:
//! 1. Batch submission
//! 2. Concurrent verification (mocked)
//! 3. Result batches out
//! 4. Statistics tracking

use nameverify::models::MatchType;
use nameverify::pipeline::{Pipeline, PipelineError};
use nameverify::testing::{fixtures as mock_fixtures, MockVerifier};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::fixtures::{collect, config, feed};

fn pipeline(mock: &MockVerifier, jobs: usize) -> Pipeline {
    Pipeline::new(Arc::new(mock.clone()), Arc::new(config(jobs, 3)))
}

// ============================================================================
// Complete Pipeline Tests
// ============================================================================

#[tokio::test]
async fn test_pipeline_single_batch() {
    let mock = MockVerifier::new();
    mock.add_record(mock_fixtures::exact_record("Bubo bubo", "Bubo bubo"))
        .await;

    let (input, feeder) = feed(vec![vec!["Bubo bubo".to_string(), "Aus bus".to_string()]]);
    let (output, collector) = collect();

    let stats = pipeline(&mock, 2)
        .run(input, output, CancellationToken::new())
        .await
        .unwrap();
    feeder.await.unwrap();
    let batches = collector.await.unwrap();

    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0][0].match_type, MatchType::Exact);
    assert_eq!(batches[0][1].match_type, MatchType::NoMatch);
    assert_eq!(stats.batches_in, 1);
    assert_eq!(stats.names_out, 2);
    assert_eq!(stats.failed_names, 0);
}

#[tokio::test]
async fn test_pipeline_concurrent_batches() {
    let mock = MockVerifier::new();
    mock.set_delay(Duration::from_millis(20)).await;

    let input_batches = mock_fixtures::name_batches(12, 3);
    let (input, feeder) = feed(input_batches.clone());
    let (output, collector) = collect();

    let stats = pipeline(&mock, 4)
        .run(input, output, CancellationToken::new())
        .await
        .unwrap();
    feeder.await.unwrap();
    let batches = collector.await.unwrap();

    assert_eq!(batches.len(), 12);
    assert_eq!(mock.call_count(), 12);
    assert_eq!(stats.batches_out, 12);

    // Batch order is not guaranteed, but every batch keeps its own order
    let expected: HashSet<Vec<String>> = input_batches.into_iter().collect();
    for batch in &batches {
        let names: Vec<String> = batch.iter().map(|r| r.name.clone()).collect();
        assert!(expected.contains(&names), "unexpected batch {names:?}");
    }
}

#[tokio::test]
async fn test_pipeline_accounts_for_every_name() {
    let mock = MockVerifier::new();
    let input_batches = vec![
        vec!["Aus bus".to_string(), "Cus dus".to_string(), "Eus fus".to_string()],
        vec!["Gus hus".to_string()],
        Vec::new(),
        vec![String::new(), "Ius jus".to_string()],
    ];

    let (input, feeder) = feed(input_batches);
    let (output, collector) = collect();

    let stats = pipeline(&mock, 3)
        .run(input, output, CancellationToken::new())
        .await
        .unwrap();
    feeder.await.unwrap();
    let batches = collector.await.unwrap();

    let records: usize = batches.iter().map(Vec::len).sum();
    assert_eq!(records, 6);
    assert_eq!(stats.names_in, 6);
    assert_eq!(stats.names_out, 6);
    assert_eq!(stats.empty_batches, 1);
    assert_eq!(mock.call_count(), 3);
    assert!((stats.success_rate() - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_pipeline_outage_yields_error_records() {
    let mock = MockVerifier::new();
    mock.set_outage("connection refused").await;

    let (input, feeder) = feed(mock_fixtures::name_batches(3, 2));
    let (output, collector) = collect();

    let stats = pipeline(&mock, 2)
        .run(input, output, CancellationToken::new())
        .await
        .unwrap();
    feeder.await.unwrap();
    let batches = collector.await.unwrap();

    assert_eq!(batches.len(), 3);
    assert!(batches
        .iter()
        .flatten()
        .all(|r| r.error.as_deref() == Some("connection refused")));
    assert_eq!(stats.failed_names, 6);
    assert_eq!(stats.success_rate(), 0.0);
}

// ============================================================================
// Failure Tests
// ============================================================================

#[tokio::test]
async fn test_pipeline_rejects_short_responses() {
    let mock = MockVerifier::new();
    mock.set_truncate(true);

    let (input, _feeder) = feed(vec![vec![
        "Aus bus".to_string(),
        "Cus dus".to_string(),
        "Eus fus".to_string(),
    ]]);
    let (output, collector) = collect();

    let err = pipeline(&mock, 1)
        .run(input, output, CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        PipelineError::CardinalityMismatch { expected, got, names_range } => {
            assert_eq!(expected, 3);
            assert_eq!(got, 2);
            assert_eq!(names_range, "Aus bus-Eus fus");
        }
        other => panic!("Expected cardinality mismatch, got: {other:?}"),
    }
    assert!(collector.await.unwrap().is_empty());
}

#[tokio::test]
async fn test_pipeline_output_closed() {
    let mock = MockVerifier::new();
    let (input, _feeder) = feed(mock_fixtures::name_batches(2, 2));
    let (output, rx) = mpsc::channel(1);
    drop(rx);

    let err = pipeline(&mock, 1)
        .run(input, output, CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err, PipelineError::OutputClosed);
}

#[tokio::test]
async fn test_pipeline_cancellation() {
    let mock = MockVerifier::new();
    let cancel = CancellationToken::new();

    // Input stays open: only cancellation can end the run
    let (input_tx, input) = mpsc::channel(1);
    input_tx
        .send(vec!["Aus bus".to_string()])
        .await
        .unwrap();
    let (output, collector) = collect();

    let run = tokio::spawn({
        let pipeline = pipeline(&mock, 2);
        let cancel = cancel.clone();
        async move { pipeline.run(input, output, cancel).await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let stats = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("pipeline did not stop after cancellation")
        .unwrap()
        .unwrap();

    assert!(stats.batches_out <= 1);
    assert!(collector.await.unwrap().len() <= 1);
    drop(input_tx);
}
