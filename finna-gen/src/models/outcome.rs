//! Fetch outcomes and batch reports

use crate::error::FetchError;
use crate::models::record::{BookEntry, RawRecord};
use finna_common::events::OutcomeKind;

/// Result of resolving one identifier
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Resolved(RawRecord),
    NotFound,
    TimedOut,
    /// Lookup transport failure
    Failed { reason: String },
    /// Never attempted because the batch was cancelled
    Cancelled,
}

impl FetchOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Resolved(_) => OutcomeKind::Resolved,
            Self::NotFound => OutcomeKind::NotFound,
            Self::TimedOut => OutcomeKind::TimedOut,
            Self::Failed { .. } => OutcomeKind::Failed,
            Self::Cancelled => OutcomeKind::Cancelled,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

impl From<Result<RawRecord, FetchError>> for FetchOutcome {
    fn from(result: Result<RawRecord, FetchError>) -> Self {
        match result {
            Ok(record) => Self::Resolved(record),
            Err(FetchError::NotFound(_)) => Self::NotFound,
            Err(FetchError::Timeout(_)) => Self::TimedOut,
            Err(FetchError::Transport(e)) => Self::Failed {
                reason: e.to_string(),
            },
        }
    }
}

/// A [`FetchOutcome`] tagged with its identifier's input position
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedOutcome {
    pub position: usize,
    pub identifier: String,
    pub outcome: FetchOutcome,
}

/// A skipped identifier, enough to rebuild a retry list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedIdentifier {
    pub position: usize,
    pub identifier: String,
    pub kind: OutcomeKind,
}

/// Final result of a batch run
///
/// `outcomes` is in completion order. Only the relative order within a block
/// is stable; use [`BatchReport::ordered`] for input order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<IndexedOutcome>,
    /// True when a forced shutdown cancelled unfinished blocks
    pub cancelled: bool,
}

impl BatchReport {
    /// Outcomes re-sorted by input position
    pub fn ordered(&self) -> Vec<&IndexedOutcome> {
        let mut ordered: Vec<&IndexedOutcome> = self.outcomes.iter().collect();
        ordered.sort_by_key(|o| o.position);
        ordered
    }

    /// Consume the report into input-ordered outcomes
    pub fn into_ordered(mut self) -> Vec<IndexedOutcome> {
        self.outcomes.sort_by_key(|o| o.position);
        self.outcomes
    }

    pub fn resolved_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_resolved()).count()
    }

    pub fn failures(&self) -> Vec<SkippedIdentifier> {
        self.ordered()
            .into_iter()
            .filter(|o| o.outcome.kind().is_failure())
            .map(|o| SkippedIdentifier {
                position: o.position,
                identifier: o.identifier.clone(),
                kind: o.outcome.kind(),
            })
            .collect()
    }

    /// Resolved records as book entries with their input position, in input order
    pub fn book_entries(&self) -> Vec<(usize, BookEntry)> {
        self.ordered()
            .into_iter()
            .filter_map(|o| match &o.outcome {
                FetchOutcome::Resolved(record) => Some((
                    o.position,
                    BookEntry::Resolved {
                        identifier: o.identifier.clone(),
                        record: record.clone(),
                    },
                )),
                _ => None,
            })
            .collect()
    }
}
