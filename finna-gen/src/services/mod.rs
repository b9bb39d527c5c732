//! Services for finna-gen

pub mod batch_fetcher;
pub mod book_processor;
pub mod files;
pub mod finna_client;
pub mod lookup;
pub mod normalizer;
pub mod record_resolver;

pub use batch_fetcher::{BatchFetcher, BatchSettings, FetchHandle};
pub use book_processor::{BookProcessor, ProcessedBook};
pub use finna_client::FinnaClient;
pub use lookup::{LookupService, RecordField, DEFAULT_FIELDS};
pub use record_resolver::RecordResolver;
