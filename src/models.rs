// Core data structures for nameverify

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::config::Config;

/// Domain used to derive the Global Names UUID namespace
const GN_NAMESPACE_DOMAIN: &[u8] = b"globalnames.org";

/// UUID v5 namespace shared by all Global Names services
pub fn gn_namespace() -> &'static Uuid {
    static NAMESPACE: OnceLock<Uuid> = OnceLock::new();
    NAMESPACE.get_or_init(|| Uuid::new_v5(&Uuid::NAMESPACE_DNS, GN_NAMESPACE_DOMAIN))
}

/// Deterministic identifier of a name-string (UUID v5 in the Global Names namespace)
pub fn name_id(name: &str) -> String {
    Uuid::new_v5(gn_namespace(), name.as_bytes()).to_string()
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

// ============================================================================
// Match classification
// ============================================================================

/// Kind of match the verifier found for a name-string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MatchType {
    #[default]
    NoMatch,
    Exact,
    Fuzzy,
    FuzzyRelaxed,
    PartialExact,
    PartialFuzzy,
    PartialFuzzyRelaxed,
    Virus,
    FacetedSearch,
}

impl MatchType {
    /// Name used on the wire and in CSV output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoMatch => "NoMatch",
            Self::Exact => "Exact",
            Self::Fuzzy => "Fuzzy",
            Self::FuzzyRelaxed => "FuzzyRelaxed",
            Self::PartialExact => "PartialExact",
            Self::PartialFuzzy => "PartialFuzzy",
            Self::PartialFuzzyRelaxed => "PartialFuzzyRelaxed",
            Self::Virus => "Virus",
            Self::FacetedSearch => "FacetedSearch",
        }
    }

    /// True for every classification except `NoMatch`
    pub fn is_match(&self) -> bool {
        !matches!(self, Self::NoMatch)
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Verification results
// ============================================================================

/// One candidate match returned by the verifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchResult {
    pub data_source_id: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub data_source_title_short: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub curation: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub record_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub outlink: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub entry_date: String,
    pub sort_score: f64,
    #[serde(rename = "matchedNameID", skip_serializing_if = "String::is_empty")]
    pub matched_name_id: String,
    pub matched_name: String,
    pub matched_cardinality: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub matched_canonical_simple: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub matched_canonical_full: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub current_record_id: String,
    #[serde(rename = "currentNameId", skip_serializing_if = "String::is_empty")]
    pub current_name_id: String,
    pub current_name: String,
    pub current_cardinality: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub current_canonical_simple: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub current_canonical_full: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub taxonomic_status: String,
    pub is_synonym: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub classification_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub classification_ranks: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub classification_ids: String,
    pub edit_distance: u32,
    pub stem_edit_distance: u32,
    pub match_type: MatchType,
}

impl MatchResult {
    /// Taxonomic status, falling back to the synonym flag when the source
    /// does not report one
    pub fn status(&self) -> &str {
        if !self.taxonomic_status.is_empty() {
            &self.taxonomic_status
        } else if self.is_synonym {
            "Synonym"
        } else {
            "Accepted"
        }
    }
}

/// Verification result for one input name-string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NameRecord {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub cardinality: u32,
    #[serde(default)]
    pub match_type: MatchType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_result: Option<MatchResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<MatchResult>,
    #[serde(default)]
    pub data_sources_num: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub curation: String,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,
}

impl NameRecord {
    /// Record standing in for a name-string whose verification failed
    pub fn failed(name: &str, error: impl Into<String>) -> Self {
        Self {
            id: name_id(name),
            name: name.to_string(),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// One failed record per name-string, in input order
    pub fn failed_batch<S: AsRef<str>>(names: &[S], error: &str) -> Vec<Self> {
        names
            .iter()
            .map(|name| Self::failed(name.as_ref(), error))
            .collect()
    }

    /// Whether verification of this name-string failed
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Metadata echoed back by the verifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    pub names_number: u32,
    pub with_all_matches: bool,
    pub with_capitalization: bool,
    pub with_species_group: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_sources: Vec<u32>,
}

/// Response body of `POST verifications`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VerifyOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub names: Vec<NameRecord>,
}

// ============================================================================
// Requests
// ============================================================================

/// A batch of name-strings together with the options it is verified with.
///
/// Serializes directly into the body of `POST verifications`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NameQuery {
    pub name_strings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_sources: Vec<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub with_capitalization: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub with_species_group: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub with_relaxed_fuzzy_match: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub with_uninomial_fuzzy_match: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub with_all_matches: bool,
}

impl NameQuery {
    /// Attach the options of a configuration snapshot to a batch
    pub fn new(name_strings: Vec<String>, config: &Config) -> Self {
        Self {
            name_strings,
            data_sources: config.data_sources.clone(),
            with_capitalization: config.with_capitalization,
            with_species_group: config.with_species_group,
            with_relaxed_fuzzy_match: config.with_relaxed_fuzzy_match,
            with_uninomial_fuzzy_match: config.with_uninomial_fuzzy_match,
            with_all_matches: config.with_all_matches,
        }
    }

    pub fn len(&self) -> usize {
        self.name_strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name_strings.is_empty()
    }

    /// "first-last" label of the batch, used in log events
    pub fn names_range(&self) -> String {
        match (self.name_strings.first(), self.name_strings.last()) {
            (Some(first), Some(last)) => format!("{first}-{last}"),
            _ => String::new(),
        }
    }
}

/// Lookup of a previously seen name-string by its identifier
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameStringInput {
    pub id: String,
    pub data_sources: Vec<u32>,
    pub with_all_matches: bool,
}

impl NameStringInput {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Query string appended to `name_strings/{id}`, without the leading `?`
    pub fn query_string(&self) -> Option<String> {
        let mut params = Vec::new();
        if !self.data_sources.is_empty() {
            let ids: Vec<String> = self.data_sources.iter().map(u32::to_string).collect();
            params.push(format!("data_sources={}", ids.join(",")));
        }
        if self.with_all_matches {
            params.push("all_matches=true".to_string());
        }
        (!params.is_empty()).then(|| params.join("&"))
    }
}

/// Response body of `GET name_strings/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NameStringOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<NameRecord>,
}

/// Year facet of a faceted search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearFacet {
    Exact(u16),
    Range { from: Option<u16>, to: Option<u16> },
}

impl std::str::FromStr for YearFacet {
    type Err = String;

    /// Parse `1758`, `1750-1800`, `1750-` or `-1800`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let year = |v: &str| -> Result<Option<u16>, String> {
            let v = v.trim();
            if v.is_empty() {
                return Ok(None);
            }
            v.parse::<u16>()
                .map(Some)
                .map_err(|_| format!("invalid year '{v}'"))
        };

        match s.split_once('-') {
            None => year(s)?
                .map(Self::Exact)
                .ok_or_else(|| "empty year".to_string()),
            Some((from, to)) => {
                let (from, to) = (year(from)?, year(to)?);
                if from.is_none() && to.is_none() {
                    return Err("empty year range".to_string());
                }
                Ok(Self::Range { from, to })
            }
        }
    }
}

/// Structured facets for `GET search/{query}`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchInput {
    pub name: Option<String>,
    pub genus: Option<String>,
    pub species: Option<String>,
    pub infraspecies: Option<String>,
    pub species_any: Option<String>,
    pub author: Option<String>,
    pub year: Option<YearFacet>,
    pub data_source_id: Option<u32>,
    pub parent_taxon: Option<String>,
    pub with_all_matches: bool,
}

impl SearchInput {
    /// True when no facet narrows the search
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.genus.is_none()
            && self.species.is_none()
            && self.infraspecies.is_none()
            && self.species_any.is_none()
            && self.author.is_none()
            && self.year.is_none()
    }

    /// Render the facets in the verifier's query language,
    /// e.g. `g:Bubo sp:bubo au:Linn. y:1758`
    pub fn to_query(&self) -> String {
        let mut parts = Vec::new();
        let text_facets = [
            ("n", &self.name),
            ("g", &self.genus),
            ("sp", &self.species),
            ("isp", &self.infraspecies),
            ("asp", &self.species_any),
            ("au", &self.author),
        ];
        for (tag, value) in text_facets {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                parts.push(format!("{tag}:{v}"));
            }
        }
        match self.year {
            Some(YearFacet::Exact(y)) => parts.push(format!("y:{y}")),
            Some(YearFacet::Range { from, to }) if from.is_some() || to.is_some() => {
                let from = from.map(|y| y.to_string()).unwrap_or_default();
                let to = to.map(|y| y.to_string()).unwrap_or_default();
                parts.push(format!("y:{from}-{to}"));
            }
            _ => {}
        }
        if let Some(ds) = self.data_source_id {
            parts.push(format!("ds:{ds}"));
        }
        if let Some(tx) = self.parent_taxon.as_deref().filter(|v| !v.is_empty()) {
            parts.push(format!("tx:{tx}"));
        }
        if self.with_all_matches {
            parts.push("all:t".to_string());
        }
        parts.join(" ")
    }
}

/// Response body of `GET search/{query}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SearchOutput {
    #[serde(default)]
    pub names: Vec<NameRecord>,
}

// ============================================================================
// Data sources
// ============================================================================

/// Metadata about one aggregated biodiversity database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DataSource {
    pub id: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uuid: String,
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title_short: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub revision_date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub doi: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub citation: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(rename = "webSiteUrl", skip_serializing_if = "String::is_empty")]
    pub website_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub curation: String,
    pub record_count: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub updated_at: String,
}
