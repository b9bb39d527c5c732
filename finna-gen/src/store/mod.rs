//! Entity deduplication store
//!
//! One append-only `id|name` file per entity kind is the system of record.
//! Each kind is owned by a single table whose in-memory index is rehydrated
//! from the file at open and updated on every append, so `resolve_or_create`
//! runs as one serialised step per kind.

mod catalog;
mod entity_table;
mod genre_table;
mod line;

pub use catalog::EntityCatalog;
pub use entity_table::{EntityTable, Resolution};
pub use genre_table::{GenreKey, GenreTable, UNKNOWN_GENRE_KEY};

use std::fmt;

/// Delimiter between the key column and the name column
pub const FIELD_DELIMITER: char = '|';

/// A deduplicated category with its own ID space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Author,
    Publisher,
    Topic,
    Genre,
}

impl EntityKind {
    /// Store file name inside the data folder
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Author => "authors.txt",
            Self::Publisher => "publishers.txt",
            Self::Topic => "topics.txt",
            Self::Genre => "genres.txt",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Author => "author",
            Self::Publisher => "publisher",
            Self::Topic => "topic",
            Self::Genre => "genre",
        };
        f.write_str(name)
    }
}
