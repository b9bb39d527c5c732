//! Error types for finna-gen
//!
//! Per-identifier failures (`LookupError`, `FetchError`) are isolated to the
//! identifier that produced them. A `StoreError` while opening the store
//! fails the run; one while writing a book abandons only that book.

use std::path::PathBuf;
use thiserror::Error;

/// Lookup service transport errors
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Failure resolving a single identifier
#[derive(Debug, Error)]
pub enum FetchError {
    /// The lookup service has no matching record
    #[error("No record found for identifier {0}")]
    NotFound(String),

    /// Resolution exceeded the bounded per-identifier wait
    #[error("Lookup for identifier {0} timed out")]
    Timeout(String),

    /// The lookup service call itself failed
    #[error("Lookup transport failed: {0}")]
    Transport(#[from] LookupError),
}

/// Entity store file errors
///
/// A missing store file is never reported here: it means an empty store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Entity store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt entity store {path} line {line}: {content:?}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        content: String,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Crate-level error
#[derive(Debug, Error)]
pub enum GenError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Common error: {0}")]
    Common(#[from] finna_common::Error),
}

/// Result type for crate-level operations
pub type GenResult<T> = Result<T, GenError>;
