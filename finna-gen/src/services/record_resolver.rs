//! Two-step identifier resolution
//!
//! 1. search the lookup service with the raw identifier
//! 2. fetch the first (most relevant) candidate with the default field set

use crate::error::FetchError;
use crate::models::RawRecord;
use crate::services::lookup::{LookupService, RecordField, DEFAULT_FIELDS};
use std::sync::Arc;
use tracing::{debug, info};

/// Resolves one identifier to a [`RawRecord`]
#[derive(Clone)]
pub struct RecordResolver {
    service: Arc<dyn LookupService>,
    fields: &'static [RecordField],
}

impl RecordResolver {
    pub fn new(service: Arc<dyn LookupService>) -> Self {
        Self {
            service,
            fields: DEFAULT_FIELDS,
        }
    }

    /// Resolve `identifier`
    ///
    /// # Errors
    /// - `FetchError::NotFound` when the search yields no candidate, or the
    ///   chosen candidate cannot be fetched by its internal ID
    /// - `FetchError::Transport` when a lookup call fails
    pub async fn resolve(&self, identifier: &str) -> Result<RawRecord, FetchError> {
        let candidates = self.service.search(identifier).await?;

        let internal_id = match candidates.into_iter().next() {
            Some(id) => id,
            None => {
                debug!(identifier = %identifier, "Search returned no candidates");
                return Err(FetchError::NotFound(identifier.to_string()));
            }
        };

        let record = self
            .service
            .fetch_record(&internal_id, self.fields)
            .await?
            .ok_or_else(|| {
                debug!(
                    identifier = %identifier,
                    internal_id = %internal_id,
                    "Candidate could not be re-resolved by internal ID"
                );
                FetchError::NotFound(identifier.to_string())
            })?;

        info!(
            identifier = %identifier,
            internal_id = %internal_id,
            title = %record.title.as_deref().unwrap_or("<untitled>"),
            "Resolved record"
        );

        Ok(record)
    }
}
