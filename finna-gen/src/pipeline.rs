//! End-to-end generator run
//!
//! read identifiers → batch fetch → per-book entity resolution → render →
//! append to the insert file → write the retry list.

use crate::config::GeneratorConfig;
use crate::error::{GenError, GenResult};
use crate::models::{BatchReport, BookEntry, SkippedIdentifier};
use crate::render::{render_book, render_created_entities};
use crate::services::files::{read_identifiers, write_failures, StatementSink};
use crate::services::{BatchFetcher, BookProcessor, LookupService, RecordResolver};
use crate::store::EntityCatalog;
use finna_common::config::ensure_directory_exists;
use finna_common::events::{EventBus, OutcomeKind};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub books_written: usize,
    pub statements_written: usize,
    pub skipped: Vec<SkippedIdentifier>,
    /// First book ID not used by this run
    pub next_book_id: u64,
    pub cancelled: bool,
}

pub struct Pipeline {
    config: GeneratorConfig,
    event_bus: EventBus,
}

impl Pipeline {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            event_bus: EventBus::default(),
        }
    }

    /// Publish fetch progress on an externally owned bus
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Run the generator
    ///
    /// `service` may be `None` only in offline mode. When `shutdown`
    /// completes before the batch does, unfinished blocks get the configured
    /// grace period and are then cancelled; everything resolved so far is
    /// still written.
    ///
    /// # Errors
    /// Configuration, input file, output file and entity store open
    /// failures. Per-identifier lookup failures and books abandoned on a
    /// store write failure end up in [`RunSummary::skipped`] instead.
    pub async fn run<F>(
        &self,
        service: Option<Arc<dyn LookupService>>,
        shutdown: F,
    ) -> GenResult<RunSummary>
    where
        F: Future<Output = ()>,
    {
        ensure_directory_exists(&self.config.data_folder)?;
        let identifiers = read_identifiers(&self.config.input_file).await?;
        let total = identifiers.len();

        let catalog = Arc::new(EntityCatalog::open(&self.config.data_folder).await?);
        match catalog.genres.description(&self.config.unknown_genre) {
            Some(description) => debug!(
                folder = %catalog.folder().display(),
                code = %self.config.unknown_genre,
                description = %description,
                "Unknown genre code is in the genre table"
            ),
            None => debug!(
                folder = %catalog.folder().display(),
                code = %self.config.unknown_genre,
                "Unknown genre code not in the genre table, rendered as the sentinel"
            ),
        }
        let processor = BookProcessor::new(catalog, self.config.unknown_genre.clone());

        let (entries, mut skipped, cancelled) = if self.config.offline {
            info!(total, "Offline run, emitting pending book rows");
            let entries: Vec<(usize, BookEntry)> = identifiers
                .into_iter()
                .map(|identifier| BookEntry::Pending { identifier })
                .enumerate()
                .collect();
            (entries, Vec::new(), false)
        } else {
            let service = service.ok_or_else(|| {
                GenError::Common(finna_common::Error::Config(
                    "a lookup service is required unless running offline".to_string(),
                ))
            })?;
            let report = self.fetch(service, identifiers, shutdown).await;
            (report.book_entries(), report.failures(), report.cancelled)
        };

        let mut sink = StatementSink::new(&self.config.insert_file);
        let written =
            write_books(&processor, &entries, self.config.first_book_id, &mut sink).await?;

        skipped.extend(written.failed);
        skipped.sort_by_key(|s| s.position);

        write_failures(&self.config.failed_file, &skipped).await?;
        for failure in &skipped {
            warn!(
                identifier = %failure.identifier,
                kind = %failure.kind,
                "Identifier not written"
            );
        }

        let summary = RunSummary {
            total,
            books_written: written.books,
            statements_written: sink.written(),
            skipped,
            next_book_id: written.next_book_id,
            cancelled,
        };

        info!(
            total = summary.total,
            books = summary.books_written,
            statements = summary.statements_written,
            skipped = summary.skipped.len(),
            next_book_id = summary.next_book_id,
            cancelled = summary.cancelled,
            "Run finished"
        );

        Ok(summary)
    }

    async fn fetch<F>(
        &self,
        service: Arc<dyn LookupService>,
        identifiers: Vec<String>,
        shutdown: F,
    ) -> BatchReport
    where
        F: Future<Output = ()>,
    {
        let fetcher = BatchFetcher::new(RecordResolver::new(service), self.config.batch)
            .with_event_bus(self.event_bus.clone());
        let mut handle = fetcher.start(identifiers);

        let interrupted = tokio::select! {
            _ = handle.wait() => false,
            _ = shutdown => true,
        };
        if interrupted {
            info!(
                completed = handle.completed(),
                total = handle.total(),
                "Shutdown requested during fetch"
            );
        }

        handle.shutdown(self.config.shutdown_grace).await
    }
}

/// What [`write_books`] produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BooksWritten {
    pub books: usize,
    /// First book ID not used
    pub next_book_id: u64,
    /// Books abandoned because the entity store failed
    pub failed: Vec<SkippedIdentifier>,
}

/// Resolve, render and append every entry, numbering books from `first_book_id`
///
/// Entries carry their input position. A store failure abandons only the
/// book that hit it: the entities it had already created still get their
/// rows, the book is listed in [`BooksWritten::failed`] and takes no book
/// ID, and the remaining books are processed. Statements of one book are
/// appended together.
///
/// # Errors
/// Only a failure writing the insert file itself.
pub async fn write_books(
    processor: &BookProcessor,
    entries: &[(usize, BookEntry)],
    first_book_id: u64,
    sink: &mut StatementSink,
) -> GenResult<BooksWritten> {
    let mut written = BooksWritten {
        books: 0,
        next_book_id: first_book_id,
        failed: Vec::new(),
    };

    for (position, entry) in entries {
        match processor.process(written.next_book_id, entry).await {
            Ok(book) => {
                sink.append(&render_book(&book)).await?;
                written.books += 1;
                written.next_book_id += 1;
            }
            Err(failure) => {
                sink.append(&render_created_entities(&failure.partial)).await?;
                written.failed.push(SkippedIdentifier {
                    position: *position,
                    identifier: entry.identifier().to_string(),
                    kind: OutcomeKind::StoreFailed,
                });
            }
        }
    }

    Ok(written)
}
