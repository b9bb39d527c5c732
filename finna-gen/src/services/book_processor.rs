//! Per-book entity resolution
//!
//! Runs a book's normalised fields through the entity catalog and collects
//! every foreign key the renderer needs.

use crate::error::StoreError;
use crate::models::{BookEntry, RawRecord};
use crate::services::normalizer::{self, AuthorName};
use crate::store::{EntityCatalog, GenreKey};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// A surrogate-key entity referenced by a book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityLink {
    pub id: u64,
    pub name: String,
    /// First time this entity was seen (its row must be rendered)
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorLink {
    pub id: u64,
    pub author: AuthorName,
    pub created: bool,
}

/// A book with every foreign key resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedBook {
    pub book_id: u64,
    pub identifier: String,
    pub title: Option<String>,
    pub release_year: Option<String>,
    pub publisher: Option<EntityLink>,
    pub authors: Vec<AuthorLink>,
    pub genres: Vec<GenreKey>,
    pub topics: Vec<EntityLink>,
}

impl ProcessedBook {
    /// Entities this book appended to the store
    pub fn created_count(&self) -> usize {
        self.publisher.iter().filter(|p| p.created).count()
            + self.authors.iter().filter(|a| a.created).count()
            + self.topics.iter().filter(|t| t.created).count()
    }
}

/// A book abandoned because the entity store failed
#[derive(Debug, Error)]
#[error("Processing book {} failed: {source}", .partial.identifier)]
pub struct BookFailure {
    /// Links resolved before the failure
    pub partial: ProcessedBook,
    #[source]
    pub source: StoreError,
}

/// Resolves books against an [`EntityCatalog`]
#[derive(Clone)]
pub struct BookProcessor {
    catalog: Arc<EntityCatalog>,
    unknown_genre: String,
}

impl BookProcessor {
    pub fn new(catalog: Arc<EntityCatalog>, unknown_genre: impl Into<String>) -> Self {
        Self {
            catalog,
            unknown_genre: unknown_genre.into(),
        }
    }

    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    /// Resolve publisher, authors, genres and topics of one book
    ///
    /// A pending entry only yields the book itself. An entity referenced
    /// twice by the same book is linked once.
    ///
    /// # Errors
    /// A store failure stops this book. The returned [`BookFailure`] still
    /// carries every link resolved before the failure, so entities this call
    /// already appended to their files can be rendered.
    pub async fn process(
        &self,
        book_id: u64,
        entry: &BookEntry,
    ) -> Result<ProcessedBook, BookFailure> {
        let mut book = ProcessedBook {
            book_id,
            identifier: entry.identifier().to_string(),
            title: None,
            release_year: None,
            publisher: None,
            authors: Vec::new(),
            genres: Vec::new(),
            topics: Vec::new(),
        };

        let record = match entry.record() {
            Some(record) => record,
            None => {
                debug!(book_id, identifier = %book.identifier, "Pending entry, no entities to resolve");
                return Ok(book);
            }
        };

        book.title = record.title.clone();
        book.release_year = record.release_year().map(str::to_string);

        if let Err(source) = self.resolve_entities(record, &mut book).await {
            warn!(
                book_id,
                identifier = %book.identifier,
                created = book.created_count(),
                error = %source,
                "Entity store failed while processing book"
            );
            return Err(BookFailure {
                partial: book,
                source,
            });
        }

        debug!(
            book_id,
            identifier = %book.identifier,
            authors = book.authors.len(),
            genres = book.genres.len(),
            topics = book.topics.len(),
            "Book processed"
        );

        Ok(book)
    }

    async fn resolve_entities(
        &self,
        record: &RawRecord,
        book: &mut ProcessedBook,
    ) -> Result<(), StoreError> {
        if let Some(name) = normalizer::publisher_key(record) {
            let res = self.catalog.publishers.resolve_or_create(&name).await?;
            book.publisher = Some(EntityLink {
                id: res.id,
                name,
                created: res.created,
            });
        }

        let mut seen = HashSet::new();
        for author in normalizer::author_keys(record) {
            let res = self.catalog.authors.resolve_or_create(&author.name).await?;
            if seen.insert(res.id) {
                book.authors.push(AuthorLink {
                    id: res.id,
                    author,
                    created: res.created,
                });
            }
        }

        let mut seen = HashSet::new();
        for code in normalizer::genre_keys(record, &self.unknown_genre) {
            let key = self.catalog.genres.resolve_genre(&code);
            if seen.insert(key.clone()) {
                book.genres.push(key);
            }
        }

        let mut seen = HashSet::new();
        for topic in normalizer::topic_keys(record) {
            let res = self.catalog.topics.resolve_or_create(&topic).await?;
            if seen.insert(res.id) {
                book.topics.push(EntityLink {
                    id: res.id,
                    name: topic,
                    created: res.created,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn brothers() -> BookEntry {
        BookEntry::Resolved {
            identifier: "951-1-08161-0".into(),
            record: RawRecord {
                title: Some("Seitsemän veljestä".into()),
                authors: vec!["Kivi, Aleksis, kirjoittaja".into()],
                subjects: vec![vec!["veljekset".into()]],
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_store_failure_keeps_links_created_before_it() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = Arc::new(EntityCatalog::open(temp_dir.path()).await.unwrap());
        std::fs::create_dir(temp_dir.path().join("topics.txt")).unwrap();
        let processor = BookProcessor::new(catalog, "-1");

        let failure = processor.process(1, &brothers()).await.unwrap_err();

        assert!(matches!(failure.source, StoreError::Io { .. }));
        assert_eq!(failure.partial.identifier, "951-1-08161-0");
        assert_eq!(failure.partial.authors.len(), 1);
        assert_eq!(failure.partial.authors[0].author.name, "Kivi, Aleksis");
        assert!(failure.partial.authors[0].created);
        assert!(failure.partial.topics.is_empty());
        assert_eq!(failure.partial.created_count(), 1);
    }

    #[tokio::test]
    async fn test_pending_entry_touches_no_store() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = Arc::new(EntityCatalog::open(temp_dir.path()).await.unwrap());
        let processor = BookProcessor::new(catalog, "-1");

        let book = processor
            .process(4, &BookEntry::Pending { identifier: "X".into() })
            .await
            .unwrap();

        assert_eq!(book.book_id, 4);
        assert_eq!(book.created_count(), 0);
        assert!(processor.catalog().authors.is_empty().await);
    }
}
