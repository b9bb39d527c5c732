//! Data models for finna-gen

pub mod outcome;
pub mod record;

pub use outcome::{BatchReport, FetchOutcome, IndexedOutcome, SkippedIdentifier};
pub use record::{BookEntry, RawRecord};
