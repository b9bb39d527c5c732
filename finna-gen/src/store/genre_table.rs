//! Genre (YKL) classification table
//!
//! The genre vocabulary is a closed hierarchy maintained out-of-band
//! (`30` → `30.1` → `30.11`), so genre keys are the codes themselves and a
//! lookup miss returns the unknown sentinel instead of minting a new entry.

use super::line::{index_key, parse_lines};
use super::EntityKind;
use crate::error::StoreError;
use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Key rendered for an unclassified genre
pub const UNKNOWN_GENRE_KEY: &str = "-1";

/// Resolved genre key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GenreKey {
    /// Code as it appears in the genre file
    Known(String),
    /// Sentinel for a code not in the vocabulary
    Unknown,
}

impl GenreKey {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(code) => code,
            Self::Unknown => UNKNOWN_GENRE_KEY,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl fmt::Display for GenreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only `code|description` table
#[derive(Debug)]
pub struct GenreTable {
    path: PathBuf,
    /// Lowercased code → code as written on file
    codes: HashMap<String, String>,
    descriptions: HashMap<String, String>,
}

impl GenreTable {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut codes = HashMap::new();
        let mut descriptions = HashMap::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                for (_, line) in parse_lines(&content) {
                    let key = index_key(line.key);
                    if codes.contains_key(&key) {
                        continue;
                    }
                    codes.insert(key.clone(), line.key.to_string());
                    descriptions.insert(key, line.name.trim().to_string());
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(
                    path = %path.display(),
                    "Genre file absent, every genre will resolve to the unknown sentinel"
                );
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        }

        info!(kind = %EntityKind::Genre, entries = codes.len(), "Genre table loaded");

        Ok(Self {
            path,
            codes,
            descriptions,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Exact (case-insensitive) code match, or [`GenreKey::Unknown`]
    pub fn resolve_genre(&self, code: &str) -> GenreKey {
        match self.codes.get(&index_key(code.trim())) {
            Some(code) => GenreKey::Known(code.clone()),
            None => {
                debug!(code = %code, "Genre code not in vocabulary");
                GenreKey::Unknown
            }
        }
    }

    pub fn description(&self, code: &str) -> Option<&str> {
        self.descriptions
            .get(&index_key(code.trim()))
            .map(String::as_str)
    }
}
