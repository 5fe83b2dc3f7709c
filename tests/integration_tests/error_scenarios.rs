//! End-to-end and error scenario integration tests
//!
//! Runs newline-delimited input through the whole stream against a mocked
//! HTTP service:
//! 1. Healthy service
//! 2. Service down for the whole run
//! 3. Slow service hitting the request timeout
//! 4. Transient failures recovered by retries
//! 5. Input lines that are not valid UTF-8

use nameverify::client::RestVerifier;
use nameverify::config::Config;
use nameverify::io::{read_batches, write_results, SinkSummary};
use nameverify::models::name_id;
use nameverify::output::{Encoder, COLUMNS};
use nameverify::pipeline::CHANNEL_CAPACITY;
use nameverify::utils::FixedInterval;
use nameverify::NameVerifier;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use super::fixtures::NAMES_FILE;

/// Answers every verification request with one NoMatch record per name
struct EchoNoMatch;

impl Respond for EchoNoMatch {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let names: Vec<Value> = body["nameStrings"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|name| {
                let id = name_id(name.as_str().unwrap_or_default());
                json!({"id": id, "name": name, "matchType": "NoMatch", "curation": "NotCurated"})
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "names": names }))
    }
}

fn names_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(NAMES_FILE.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn facade(uri: &str, config: Config, timeout: Duration, attempts: u32) -> NameVerifier {
    let rest = RestVerifier::with_timeout(&format!("{uri}/api/v1"), timeout)
        .unwrap()
        .with_retry_policy(FixedInterval::new(attempts, Duration::from_millis(10)));
    NameVerifier::with_verifier(config, Arc::new(rest))
}

/// File -> batches -> pipeline -> CSV text
async fn run_file(verifier: &NameVerifier) -> (String, SinkSummary) {
    let file = names_file();
    let reader = BufReader::new(tokio::fs::File::open(file.path()).await.unwrap());
    let cancel = CancellationToken::new();

    let (batch_tx, batch_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (result_tx, result_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let mut buf = Vec::new();

    let (read, run, written) = tokio::join!(
        read_batches(reader, verifier.config().batch_size, batch_tx, cancel.clone()),
        verifier.verify_stream(batch_rx, result_tx, cancel.clone()),
        write_results(result_rx, &mut buf, Encoder::from_config(verifier.config())),
    );

    assert_eq!(read.unwrap(), 5);
    run.unwrap();
    let summary = written.unwrap();
    (String::from_utf8(buf).unwrap(), summary)
}

#[tokio::test]
async fn test_file_to_csv_end_to_end() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/verifications"))
        .respond_with(EchoNoMatch)
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = Config {
        jobs: 2,
        batch_size: 2,
        ..Default::default()
    };
    let verifier = facade(&mock_server.uri(), config, Duration::from_secs(5), 3);
    let (csv, summary) = run_file(&verifier).await;

    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], COLUMNS.join(","));
    assert_eq!(lines.len(), 6);
    assert_eq!(summary.records, 5);
    assert_eq!(summary.errors, 0);

    for name in ["Plantago major L.", "NotARealName123", "Bubo bubo", "Pomatomus saltatrix"] {
        let row = lines
            .iter()
            .find(|l| l.contains(&format!(",{name},")))
            .unwrap_or_else(|| panic!("no row for {name}"));
        assert!(row.starts_with("BestMatch,NoMatch,"));
        assert_eq!(row.split(',').count(), COLUMNS.len());
    }
}

#[tokio::test]
async fn test_latin1_line_does_not_stop_the_run() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/verifications"))
        .respond_with(EchoNoMatch)
        .mount(&mock_server)
        .await;

    let verifier = facade(
        &mock_server.uri(),
        Config::default(),
        Duration::from_secs(5),
        3,
    );
    let input: &'static [u8] = b"Aus bus\nAbies alba Linn\xe9\nCus dus\n";
    let cancel = CancellationToken::new();
    let (batch_tx, batch_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (result_tx, result_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let mut buf = Vec::new();

    let (read, run, written) = tokio::join!(
        read_batches(input, 2, batch_tx, cancel.clone()),
        verifier.verify_stream(batch_rx, result_tx, cancel.clone()),
        write_results(result_rx, &mut buf, Encoder::from_config(verifier.config())),
    );

    assert_eq!(read.unwrap(), 3);
    run.unwrap();
    assert_eq!(written.unwrap().records, 3);

    let csv = String::from_utf8(buf).unwrap();
    for name in ["Aus bus", "Abies alba Linn\u{FFFD}", "Cus dus"] {
        assert!(csv.contains(&format!(",{name},")), "no row for {name}");
    }
}

#[tokio::test]
async fn test_service_down_end_to_end() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/verifications"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database is gone"))
        .mount(&mock_server)
        .await;

    let config = Config {
        jobs: 1,
        batch_size: 5,
        ..Default::default()
    };
    let verifier = facade(&mock_server.uri(), config, Duration::from_secs(5), 2);
    let (csv, summary) = run_file(&verifier).await;

    // Every input line still gets a row, carrying the error
    assert_eq!(summary.records, 5);
    assert_eq!(summary.errors, 5);
    let rows: Vec<&str> = csv.lines().skip(1).collect();
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|r| r.contains("database is gone")));
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_slow_service_hits_request_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/verifications"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"names":[]}"#)
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let verifier = facade(
        &mock_server.uri(),
        Config::default(),
        Duration::from_millis(200),
        1,
    );
    let records = verifier
        .verify_batch(vec!["Bubo bubo".to_string(), "Aus bus".to_string()])
        .await;

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.has_error()));
    assert_eq!(records[1].name, "Aus bus");
}

#[tokio::test]
async fn test_transient_failure_recovered() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/verifications"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/verifications"))
        .respond_with(EchoNoMatch)
        .mount(&mock_server)
        .await;

    let verifier = facade(
        &mock_server.uri(),
        Config::default(),
        Duration::from_secs(5),
        3,
    );
    let record = verifier.verify_one("Pomatomus saltatrix").await;

    assert_eq!(record.name, "Pomatomus saltatrix");
    assert!(record.error.is_none());
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
}
