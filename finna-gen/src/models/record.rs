//! Bibliographic record types

use serde::{Deserialize, Serialize};

/// Metadata for one identifier as returned by the lookup service
///
/// Every field is optional or possibly empty: a record missing its publisher
/// is still usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Lookup service's internal record ID
    pub internal_id: String,
    pub title: Option<String>,
    /// Author strings, e.g. `"Leary, Timothy Francis, 1920-1996, kirjoittaja"`
    pub authors: Vec<String>,
    /// Hierarchical genre (YKL) classification codes
    pub genre_codes: Vec<String>,
    /// Subject groups; each group is an ordered list of topic phrases
    pub subjects: Vec<Vec<String>>,
    pub publishers: Vec<String>,
    pub publication_dates: Vec<String>,
    pub languages: Vec<String>,
    pub summary: Option<String>,
}

impl RawRecord {
    /// First listed publisher, if any
    pub fn publisher(&self) -> Option<&str> {
        self.publishers.first().map(String::as_str)
    }

    /// First listed publication date, used as the release year
    pub fn release_year(&self) -> Option<&str> {
        self.publication_dates.first().map(String::as_str)
    }
}

/// A book awaiting processing
#[derive(Debug, Clone, PartialEq)]
pub enum BookEntry {
    /// Identifier resolved to a full record
    Resolved { identifier: String, record: RawRecord },
    /// Placeholder carrying only the identifier (offline runs)
    Pending { identifier: String },
}

impl BookEntry {
    pub fn identifier(&self) -> &str {
        match self {
            Self::Resolved { identifier, .. } | Self::Pending { identifier } => identifier,
        }
    }

    pub fn record(&self) -> Option<&RawRecord> {
        match self {
            Self::Resolved { record, .. } => Some(record),
            Self::Pending { .. } => None,
        }
    }
}
