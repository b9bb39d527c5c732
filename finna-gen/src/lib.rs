//! finna-gen library interface
//!
//! Resolves book identifiers against the Finna API, deduplicates authors,
//! publishers and topics into append-only entity files, and renders SQL
//! insert statements. Exposes the pipeline pieces for integration testing.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod services;
pub mod store;

pub use crate::config::{ConfigOverrides, GeneratorConfig};
pub use crate::error::{FetchError, GenError, GenResult, LookupError, StoreError};
pub use crate::pipeline::{Pipeline, RunSummary};
