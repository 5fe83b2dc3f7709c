//! Testing utilities and a mock verification service.
//!
//! [`MockVerifier`] implements [`crate::client::Verifier`] without any
//! network, so the pipeline and the facade can be tested in isolation.
//!
//! # Example
//!
//! ```rust,ignore
//! use nameverify::testing::{fixtures, MockVerifier};
//!
//! let verifier = MockVerifier::new();
//! verifier.add_record(fixtures::exact_record("Plantago major L.", "Plantago major")).await;
//!
//! let records = verifier.verify(&query).await;
//! assert_eq!(verifier.call_count(), 1);
//! ```

mod mock_verifier;

pub use mock_verifier::MockVerifier;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::models::{name_id, DataSource, MatchResult, MatchType, NameRecord};

    /// Best result of an exact match in the Catalogue of Life
    pub fn exact_result(name: &str, canonical: &str) -> MatchResult {
        MatchResult {
            data_source_id: 1,
            data_source_title_short: "Catalogue of Life".to_string(),
            curation: "Curated".to_string(),
            record_id: format!("col-{}", canonical.replace(' ', "-").to_lowercase()),
            sort_score: 9.2,
            matched_name_id: name_id(name),
            matched_name: name.to_string(),
            matched_cardinality: canonical.split_whitespace().count() as u32,
            matched_canonical_simple: canonical.to_string(),
            matched_canonical_full: canonical.to_string(),
            current_name: name.to_string(),
            current_cardinality: canonical.split_whitespace().count() as u32,
            current_canonical_simple: canonical.to_string(),
            current_canonical_full: canonical.to_string(),
            taxonomic_status: "Accepted".to_string(),
            classification_path: format!("Biota|{canonical}"),
            match_type: MatchType::Exact,
            ..Default::default()
        }
    }

    /// Record of a name-string the service matched exactly
    pub fn exact_record(name: &str, canonical: &str) -> NameRecord {
        NameRecord {
            id: name_id(name),
            name: name.to_string(),
            cardinality: canonical.split_whitespace().count() as u32,
            match_type: MatchType::Exact,
            best_result: Some(exact_result(name, canonical)),
            data_sources_num: 1,
            curation: "Curated".to_string(),
            ..Default::default()
        }
    }

    /// Record of a name-string the service did not recognise
    pub fn no_match_record(name: &str) -> NameRecord {
        NameRecord {
            id: name_id(name),
            name: name.to_string(),
            curation: "NotCurated".to_string(),
            ..Default::default()
        }
    }

    /// Data-source metadata with the given ID
    pub fn data_source(id: u32, title_short: &str) -> DataSource {
        DataSource {
            id,
            title: format!("{title_short} database"),
            title_short: title_short.to_string(),
            curation: "Curated".to_string(),
            record_count: 1000 * u64::from(id),
            ..Default::default()
        }
    }

    /// `count` batches of `size` distinct name-strings
    pub fn name_batches(count: usize, size: usize) -> Vec<Vec<String>> {
        (0..count)
            .map(|b| (0..size).map(|n| format!("Aus bus{b}x{n}")).collect())
            .collect()
    }
}
