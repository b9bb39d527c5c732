//! Progress event types and EventBus
//!
//! Batch runs publish their progress here so a caller can observe partial
//! results while blocks are still running.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Classification of a single identifier's result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeKind {
    Resolved,
    NotFound,
    TimedOut,
    Failed,
    Cancelled,
    /// Resolved, but the entity store failed while writing the book
    StoreFailed,
}

impl OutcomeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::NotFound => "not_found",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::StoreFailed => "store_failed",
        }
    }

    /// Whether the identifier was skipped and belongs on a retry list
    pub fn is_failure(self) -> bool {
        !matches!(self, Self::Resolved)
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// finna-gen event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FinnaEvent {
    /// A batch was partitioned and its block tasks dispatched
    BatchStarted {
        run_id: Uuid,
        total: usize,
        blocks: usize,
        timestamp: DateTime<Utc>,
    },

    /// One identifier finished (in any outcome)
    IdentifierFinished {
        run_id: Uuid,
        /// Position of the identifier in the input sequence
        position: usize,
        identifier: String,
        outcome: OutcomeKind,
        /// Identifiers finished so far, this one included
        completed: usize,
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// Every block task finished
    BatchCompleted {
        run_id: Uuid,
        resolved: usize,
        skipped: usize,
        elapsed_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Shutdown grace period elapsed and remaining blocks were cancelled
    BatchCancelled {
        run_id: Uuid,
        completed: usize,
        total: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast bus for [`FinnaEvent`]s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FinnaEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per receiver
    ///
    /// Lagging receivers lose the oldest events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<FinnaEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: FinnaEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_emitted_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let run_id = Uuid::new_v4();

        bus.emit_lossy(FinnaEvent::BatchStarted {
            run_id,
            total: 3,
            blocks: 2,
            timestamp: Utc::now(),
        });

        match rx.recv().await.unwrap() {
            FinnaEvent::BatchStarted { run_id: got, total, blocks, .. } => {
                assert_eq!(got, run_id);
                assert_eq!(total, 3);
                assert_eq!(blocks, 2);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_ignored() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit_lossy(FinnaEvent::BatchCancelled {
            run_id: Uuid::new_v4(),
            completed: 0,
            total: 1,
            timestamp: Utc::now(),
        });
    }

    #[test]
    fn test_outcome_kind_serializes_tagged() {
        let event = FinnaEvent::IdentifierFinished {
            run_id: Uuid::nil(),
            position: 1,
            identifier: "978-952-483-142-0".to_string(),
            outcome: OutcomeKind::TimedOut,
            completed: 2,
            total: 3,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "IdentifierFinished");
        assert_eq!(json["outcome"], "TimedOut");
        assert!(OutcomeKind::TimedOut.is_failure());
        assert!(!OutcomeKind::Resolved.is_failure());
        assert!(OutcomeKind::StoreFailed.is_failure());
        assert_eq!(OutcomeKind::StoreFailed.to_string(), "store_failed");
    }
}
