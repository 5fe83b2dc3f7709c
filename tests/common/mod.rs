//! Common test utilities

use nameverify::client::RestVerifier;
use nameverify::utils::FixedInterval;
use std::time::Duration;

/// Verification response for "Plantago major L." (exact) and
/// "NotARealName123" (no match)
pub const PLANTAGO_RESPONSE: &str = r#"{
  "metadata": {"namesNumber": 2},
  "names": [
    {
      "id": "3ff8e2b0-cc27-5ac6-9a1b-d2a2a2a0e5f6",
      "name": "Plantago major L.",
      "cardinality": 2,
      "matchType": "Exact",
      "bestResult": {
        "dataSourceId": 1,
        "dataSourceTitleShort": "Catalogue of Life",
        "curation": "Curated",
        "recordId": "3FDN",
        "matchedName": "Plantago major L.",
        "matchedCardinality": 2,
        "matchedCanonicalSimple": "Plantago major",
        "matchedCanonicalFull": "Plantago major",
        "currentName": "Plantago major L.",
        "currentCardinality": 2,
        "taxonomicStatus": "Accepted",
        "classificationPath": "Biota|Plantae|Plantaginaceae|Plantago|Plantago major",
        "editDistance": 0,
        "stemEditDistance": 0,
        "matchType": "Exact"
      },
      "dataSourcesNum": 1,
      "curation": "Curated",
      "error": ""
    },
    {
      "id": "b0c3c8a5-9e9e-5f7c-8f0a-0d3a3e1b1c2d",
      "name": "NotARealName123",
      "cardinality": 0,
      "matchType": "NoMatch",
      "dataSourcesNum": 0,
      "curation": "NotCurated",
      "error": ""
    }
  ]
}"#;

/// Names matching [`PLANTAGO_RESPONSE`], in order
#[allow(dead_code)]
pub fn plantago_names() -> Vec<String> {
    vec!["Plantago major L.".to_string(), "NotARealName123".to_string()]
}

/// Verification response echoing every name as NoMatch
#[allow(dead_code)]
pub fn no_match_response(names: &[String]) -> String {
    let names: Vec<serde_json::Value> = names
        .iter()
        .map(|n| serde_json::json!({"name": n, "matchType": "NoMatch", "id": nameverify::models::name_id(n)}))
        .collect();
    serde_json::json!({ "names": names }).to_string()
}

/// REST client against a mock server with a short retry interval
#[allow(dead_code)]
pub fn rest_verifier(uri: &str) -> RestVerifier {
    RestVerifier::with_timeout(&format!("{uri}/api/v1"), Duration::from_secs(5))
        .unwrap()
        .with_retry_policy(FixedInterval::new(3, Duration::from_millis(10)))
}
