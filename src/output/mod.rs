//! Rendering of verification records into CSV, TSV or JSON
//!
//! The [`Encoder`] is a pure value: it holds the output options and turns one
//! [`NameRecord`] at a time into text. Delimited output always has exactly
//! [`COLUMNS`]`.len()` fields per row, quoted per RFC 4180 when needed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

use crate::config::Config;
use crate::models::{MatchResult, MatchType, NameRecord};

/// Column names of delimited output, in order
pub const COLUMNS: [&str; 13] = [
    "Kind",
    "MatchType",
    "EditDistance",
    "ScientificName",
    "MatchedName",
    "MatchedCanonical",
    "TaxonId",
    "CurrentName",
    "TaxonomicStatus",
    "DataSourceId",
    "DataSourceTitle",
    "ClassificationPath",
    "Error",
];

/// Row label of the best match
pub const BEST_MATCH: &str = "BestMatch";

/// Row label of secondary results from preferred data sources
pub const PREFERRED_MATCH: &str = "PreferredMatch";

/// Row label of secondary results from an all-matches request
pub const SORTED_MATCH: &str = "SortedMatch";

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    #[default]
    #[serde(rename = "csv")]
    Csv,
    #[serde(rename = "tsv")]
    Tsv,
    #[serde(rename = "compact")]
    CompactJson,
    #[serde(rename = "pretty")]
    PrettyJson,
}

/// Unknown output format name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown output format '{0}', expected one of csv, tsv, compact, pretty")]
pub struct ParseFormatError(pub String);

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::CompactJson => "compact",
            Self::PrettyJson => "pretty",
        }
    }

    /// Parse a format name, falling back to CSV with a warning
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_else(|e: ParseFormatError| {
            warn!(error = %e, "Falling back to csv output");
            Self::Csv
        })
    }

    /// Field delimiter for delimited formats
    fn delimiter(&self) -> Option<u8> {
        match self {
            Self::Csv => Some(b','),
            Self::Tsv => Some(b'\t'),
            Self::CompactJson | Self::PrettyJson => None,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            "compact" | "json" => Ok(Self::CompactJson),
            "pretty" => Ok(Self::PrettyJson),
            _ => Err(ParseFormatError(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header line for a format; empty for JSON
pub fn csv_header(format: OutputFormat) -> String {
    match format.delimiter() {
        Some(delimiter) => to_delimited(&COLUMNS, delimiter),
        None => String::new(),
    }
}

/// One delimited line of arbitrary fields; `None` for JSON formats
pub fn delimited_row<S: AsRef<[u8]>>(fields: &[S], format: OutputFormat) -> Option<String> {
    format
        .delimiter()
        .map(|delimiter| to_delimited(fields, delimiter))
}

/// Renders verification records according to the output options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Encoder {
    pub format: OutputFormat,
    pub preferred_only: bool,
    pub with_all_matches: bool,
}

impl Encoder {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            format: config.format,
            preferred_only: config.preferred_only,
            with_all_matches: config.with_all_matches,
        }
    }

    pub fn preferred_only(mut self, preferred_only: bool) -> Self {
        self.preferred_only = preferred_only;
        self
    }

    pub fn with_all_matches(mut self, with_all_matches: bool) -> Self {
        self.with_all_matches = with_all_matches;
        self
    }

    pub fn header(&self) -> String {
        csv_header(self.format)
    }

    /// Render one record. Delimited formats may produce several rows joined
    /// by `\n`, never a trailing newline.
    pub fn encode(&self, record: &NameRecord) -> String {
        match self.format.delimiter() {
            Some(delimiter) => self.delimited(record, delimiter),
            None => self.json(record),
        }
    }

    fn secondary_kind(&self) -> &'static str {
        if self.with_all_matches {
            SORTED_MATCH
        } else {
            PREFERRED_MATCH
        }
    }

    fn delimited(&self, record: &NameRecord, delimiter: u8) -> String {
        let mut rows = Vec::with_capacity(record.results.len() + 1);

        if !self.preferred_only {
            if let Some(best) = &record.best_result {
                rows.push(to_delimited(&row(BEST_MATCH, record, Some(best)), delimiter));
            }
        }

        let kind = self.secondary_kind();
        for result in &record.results {
            rows.push(to_delimited(&row(kind, record, Some(result)), delimiter));
        }

        if rows.is_empty() {
            let kind = if self.preferred_only { kind } else { BEST_MATCH };
            rows.push(to_delimited(&row(kind, record, None), delimiter));
        }

        rows.join("\n")
    }

    fn json(&self, record: &NameRecord) -> String {
        let trimmed;
        let record = if self.preferred_only && record.best_result.is_some() {
            trimmed = NameRecord {
                best_result: None,
                ..record.clone()
            };
            &trimmed
        } else {
            record
        };

        let encoded = if self.format == OutputFormat::PrettyJson {
            serde_json::to_string_pretty(record)
        } else {
            serde_json::to_string(record)
        };

        encoded.unwrap_or_else(|e| {
            warn!(name = %record.name, error = %e, "Cannot encode record to JSON");
            String::new()
        })
    }
}

/// Field values of one row; `None` yields the NoMatch placeholder
fn row(kind: &str, record: &NameRecord, result: Option<&MatchResult>) -> Vec<String> {
    let error = record.error.clone().unwrap_or_default();

    let Some(res) = result else {
        let mut fields = vec![String::new(); COLUMNS.len()];
        fields[0] = kind.to_string();
        fields[1] = MatchType::NoMatch.to_string();
        fields[3] = record.name.clone();
        fields[12] = error;
        return fields;
    };

    let canonical = if res.matched_canonical_full.is_empty() {
        &res.matched_canonical_simple
    } else {
        &res.matched_canonical_full
    };

    vec![
        kind.to_string(),
        res.match_type.to_string(),
        res.edit_distance.to_string(),
        record.name.clone(),
        res.matched_name.clone(),
        canonical.clone(),
        res.record_id.clone(),
        res.current_name.clone(),
        res.status().to_string(),
        res.data_source_id.to_string(),
        res.data_source_title_short.clone(),
        res.classification_path.clone(),
        error,
    ]
}

fn to_delimited<S: AsRef<[u8]>>(fields: &[S], delimiter: u8) -> String {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let written = writer
        .write_record(fields)
        .map_err(|e| e.to_string())
        .and_then(|()| writer.into_inner().map_err(|e| e.to_string()));

    match written {
        Ok(buf) => {
            let line = String::from_utf8_lossy(&buf);
            line.strip_suffix('\n').unwrap_or(&line).to_string()
        }
        Err(e) => {
            warn!(error = %e, "Cannot encode delimited row");
            String::new()
        }
    }
}
