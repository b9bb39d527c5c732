//! Lookup service capability
//!
//! The resolver only needs two request shapes: search by identifier, and
//! fetch one detailed record by the service's internal ID.

use crate::error::LookupError;
use crate::models::RawRecord;
use async_trait::async_trait;

/// Record fields requested from the lookup service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    Authors,
    Title,
    Publishers,
    PublicationDates,
    Classifications,
    Subjects,
    Year,
    Languages,
    Summary,
}

impl RecordField {
    /// Wire name of the field
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authors => "authors",
            Self::Title => "title",
            Self::Publishers => "publishers",
            Self::PublicationDates => "publicationDates",
            Self::Classifications => "classifications",
            Self::Subjects => "subjects",
            Self::Year => "year",
            Self::Languages => "languages",
            Self::Summary => "summary",
        }
    }
}

/// Field set requested on every detailed fetch
pub const DEFAULT_FIELDS: &[RecordField] = &[
    RecordField::Authors,
    RecordField::Title,
    RecordField::Publishers,
    RecordField::PublicationDates,
    RecordField::Classifications,
    RecordField::Subjects,
    RecordField::Year,
    RecordField::Languages,
    RecordField::Summary,
];

#[async_trait]
pub trait LookupService: Send + Sync {
    /// Candidate internal record IDs for `identifier`, most relevant first
    async fn search(&self, identifier: &str) -> Result<Vec<String>, LookupError>;

    /// Detailed record for an internal ID; `None` when the service has no such record
    async fn fetch_record(
        &self,
        internal_id: &str,
        fields: &[RecordField],
    ) -> Result<Option<RawRecord>, LookupError>;
}
