//! Bounded-parallelism batch fetcher
//!
//! Identifiers are split into at most `concurrency` contiguous blocks. Each
//! block runs as one task and resolves its identifiers sequentially; every
//! outcome is appended to the shared result list as soon as it is known, so
//! partial results are observable before the batch finishes.
//!
//! Ordering: within a block, outcomes are appended in input order. Across
//! blocks nothing is guaranteed; [`BatchReport::ordered`] re-sorts by input
//! position.

use crate::error::FetchError;
use crate::models::{BatchReport, FetchOutcome, IndexedOutcome};
use crate::services::record_resolver::RecordResolver;
use chrono::Utc;
use finna_common::config::FetchConfig;
use finna_common::events::{EventBus, FinnaEvent, OutcomeKind};
use std::collections::HashSet;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How long cooperative cancellation may take before tasks are aborted
const CANCEL_WAIT: Duration = Duration::from_millis(500);

/// Batch fetch tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    /// Maximum number of concurrently running blocks
    pub concurrency: usize,
    /// Bounded wait per identifier
    pub identifier_timeout: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for BatchSettings {
    fn from(config: &FetchConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            identifier_timeout: Duration::from_secs(config.identifier_timeout_secs),
        }
    }
}

/// Split `len` items into contiguous blocks of `ceil(len / concurrency)`
///
/// The number of blocks never exceeds `concurrency` (a zero limit is
/// treated as one).
pub fn partition(len: usize, concurrency: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    let block_size = len.div_ceil(concurrency.max(1));
    (0..len)
        .step_by(block_size)
        .map(|start| start..(start + block_size).min(len))
        .collect()
}

/// Drives a [`RecordResolver`] over many identifiers in parallel
pub struct BatchFetcher {
    resolver: RecordResolver,
    settings: BatchSettings,
    event_bus: EventBus,
}

impl BatchFetcher {
    pub fn new(resolver: RecordResolver, settings: BatchSettings) -> Self {
        Self {
            resolver,
            settings,
            event_bus: EventBus::default(),
        }
    }

    /// Publish progress on an externally owned bus
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn settings(&self) -> BatchSettings {
        self.settings
    }

    /// Dispatch one task per block and return immediately
    pub fn start(&self, identifiers: Vec<String>) -> FetchHandle {
        let run_id = Uuid::new_v4();
        let total = identifiers.len();
        let blocks = partition(total, self.settings.concurrency);

        let shared = Arc::new(SharedProgress {
            run_id,
            total,
            outcomes: Mutex::new(Vec::with_capacity(total)),
            completed: AtomicUsize::new(0),
            event_bus: self.event_bus.clone(),
        });
        let cancel = CancellationToken::new();
        let identifiers = Arc::new(identifiers);
        let mut tasks = JoinSet::new();

        info!(
            run_id = %run_id,
            total,
            blocks = blocks.len(),
            concurrency = self.settings.concurrency,
            "Starting batch fetch"
        );
        self.event_bus.emit_lossy(FinnaEvent::BatchStarted {
            run_id,
            total,
            blocks: blocks.len(),
            timestamp: Utc::now(),
        });

        for (block_no, range) in blocks.into_iter().enumerate() {
            let block: Vec<(usize, String)> = range
                .clone()
                .map(|position| (position, identifiers[position].clone()))
                .collect();
            let worker = BlockWorker {
                block_no,
                resolver: self.resolver.clone(),
                timeout: self.settings.identifier_timeout,
                shared: Arc::clone(&shared),
                cancel: cancel.clone(),
            };
            debug!(run_id = %run_id, block_no, start = range.start, end = range.end, "Dispatching block");
            tasks.spawn(worker.run(block));
        }

        FetchHandle {
            run_id,
            identifiers,
            shared,
            tasks,
            cancel,
            started: Instant::now(),
        }
    }

    /// Resolve every identifier and wait for all blocks
    pub async fn fetch_all(&self, identifiers: Vec<String>) -> BatchReport {
        self.start(identifiers).join().await
    }
}

/// State shared by every block task of one run
struct SharedProgress {
    run_id: Uuid,
    total: usize,
    outcomes: Mutex<Vec<IndexedOutcome>>,
    completed: AtomicUsize,
    event_bus: EventBus,
}

impl SharedProgress {
    fn push(&self, outcome: IndexedOutcome) {
        let kind = outcome.outcome.kind();
        let position = outcome.position;
        let identifier = outcome.identifier.clone();

        self.outcomes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(outcome);
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;

        self.event_bus.emit_lossy(FinnaEvent::IdentifierFinished {
            run_id: self.run_id,
            position,
            identifier,
            outcome: kind,
            completed,
            total: self.total,
            timestamp: Utc::now(),
        });
    }

    fn snapshot(&self) -> Vec<IndexedOutcome> {
        self.outcomes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn take(&self) -> Vec<IndexedOutcome> {
        std::mem::take(
            &mut *self
                .outcomes
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}

struct BlockWorker {
    block_no: usize,
    resolver: RecordResolver,
    timeout: Duration,
    shared: Arc<SharedProgress>,
    cancel: CancellationToken,
}

impl BlockWorker {
    async fn run(self, block: Vec<(usize, String)>) {
        for (position, identifier) in block {
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(block_no = self.block_no, position, "Block cancelled");
                    return;
                }
                result = tokio::time::timeout(self.timeout, self.resolver.resolve(&identifier)) => {
                    let result = result
                        .unwrap_or_else(|_| Err(FetchError::Timeout(identifier.clone())));
                    FetchOutcome::from(result)
                }
            };

            log_outcome(position, &identifier, &outcome);
            self.shared.push(IndexedOutcome {
                position,
                identifier,
                outcome,
            });
        }
        debug!(block_no = self.block_no, "Block finished");
    }
}

fn log_outcome(position: usize, identifier: &str, outcome: &FetchOutcome) {
    match outcome {
        FetchOutcome::Resolved(_) => {
            debug!(position, identifier = %identifier, "Identifier resolved");
        }
        FetchOutcome::Failed { reason } => {
            warn!(
                position,
                identifier = %identifier,
                kind = %OutcomeKind::Failed,
                reason = %reason,
                "Identifier skipped"
            );
        }
        other => {
            warn!(
                position,
                identifier = %identifier,
                kind = %other.kind(),
                "Identifier skipped"
            );
        }
    }
}

/// Handle on a running batch
///
/// Dropping the handle aborts any blocks still running.
pub struct FetchHandle {
    run_id: Uuid,
    identifiers: Arc<Vec<String>>,
    shared: Arc<SharedProgress>,
    tasks: JoinSet<()>,
    cancel: CancellationToken,
    started: Instant,
}

impl FetchHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn total(&self) -> usize {
        self.shared.total
    }

    /// Identifiers finished so far
    pub fn completed(&self) -> usize {
        self.shared.completed.load(Ordering::SeqCst)
    }

    /// Whether every identifier has an outcome
    pub fn is_done(&self) -> bool {
        self.completed() >= self.total()
    }

    /// Copy of the outcomes appended so far, in completion order
    pub fn snapshot(&self) -> Vec<IndexedOutcome> {
        self.shared.snapshot()
    }

    /// Progress events for this run (and any other run on the same bus)
    pub fn subscribe(&self) -> broadcast::Receiver<FinnaEvent> {
        self.shared.event_bus.subscribe()
    }

    /// Wait until every block task has finished, keeping the handle
    ///
    /// Cancel-safe: dropping this future (e.g. in a `select!` against a
    /// shutdown signal) loses no outcome.
    pub async fn wait(&mut self) {
        drain(&mut self.tasks).await;
    }

    /// Wait for every block task to finish
    pub async fn join(mut self) -> BatchReport {
        self.wait().await;
        self.finish(false)
    }

    /// Wait up to `grace` for the blocks, then cancel whatever is still running
    ///
    /// Cancellation is cooperative first (blocks stop at their next
    /// identifier or abandon the in-flight lookup); tasks still alive after a
    /// short wait are aborted. Outcomes appended before cancellation are kept.
    pub async fn shutdown(mut self, grace: Duration) -> BatchReport {
        if tokio::time::timeout(grace, drain(&mut self.tasks)).await.is_ok() {
            return self.finish(false);
        }

        warn!(
            run_id = %self.run_id,
            completed = self.completed(),
            total = self.total(),
            "Shutdown grace period elapsed, cancelling remaining blocks"
        );
        self.cancel.cancel();

        if tokio::time::timeout(CANCEL_WAIT, drain(&mut self.tasks))
            .await
            .is_err()
        {
            warn!(run_id = %self.run_id, "Aborting blocks that ignored cancellation");
            self.tasks.abort_all();
            drain(&mut self.tasks).await;
        }

        self.shared.event_bus.emit_lossy(FinnaEvent::BatchCancelled {
            run_id: self.run_id,
            completed: self.completed(),
            total: self.total(),
            timestamp: Utc::now(),
        });

        self.finish(true)
    }

    /// Build the report, giving every identifier without an outcome one
    fn finish(&self, cancelled: bool) -> BatchReport {
        let mut outcomes = self.shared.take();
        let seen: HashSet<usize> = outcomes.iter().map(|o| o.position).collect();

        for (position, identifier) in self.identifiers.iter().enumerate() {
            if seen.contains(&position) {
                continue;
            }
            let outcome = if cancelled {
                FetchOutcome::Cancelled
            } else {
                FetchOutcome::Failed {
                    reason: "block task ended before resolving".to_string(),
                }
            };
            log_outcome(position, identifier, &outcome);
            outcomes.push(IndexedOutcome {
                position,
                identifier: identifier.clone(),
                outcome,
            });
        }

        let report = BatchReport {
            outcomes,
            cancelled,
        };
        let resolved = report.resolved_count();
        let skipped = report.outcomes.len() - resolved;
        let elapsed_ms = self.started.elapsed().as_millis() as u64;

        info!(
            run_id = %self.run_id,
            resolved,
            skipped,
            cancelled,
            elapsed_ms,
            "Batch fetch finished"
        );

        if !cancelled {
            self.shared.event_bus.emit_lossy(FinnaEvent::BatchCompleted {
                run_id: self.run_id,
                resolved,
                skipped,
                elapsed_ms,
                timestamp: Utc::now(),
            });
        }

        report
    }
}

async fn drain(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            if e.is_panic() {
                warn!("Block task panicked: {}", e);
            }
        }
    }
}
