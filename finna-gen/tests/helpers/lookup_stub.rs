//! Scripted in-memory lookup service
//!
//! Each identifier is given a script describing how the service answers it.
//! Calls are counted and in-flight requests tracked, so tests can assert
//! "exactly once" and the concurrency ceiling without any network.

use async_trait::async_trait;
use finna_gen::models::RawRecord;
use finna_gen::services::{LookupService, RecordField};
use finna_gen::LookupError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

const INTERNAL_PREFIX: &str = "stub.";

/// How the stub answers one identifier
#[derive(Debug, Clone)]
pub enum Script {
    /// Search finds one candidate, fetch returns the record
    Found(RawRecord),
    /// Search finds nothing
    Missing,
    /// Search finds a candidate that the detail fetch cannot find
    Dangling,
    /// Search fails at the transport level
    Broken(String),
    /// Wait before answering the search
    Slow(Duration, Box<Script>),
}

#[derive(Default)]
pub struct ScriptedLookup {
    scripts: HashMap<String, Script>,
    search_calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, identifier: &str, script: Script) -> Self {
        self.scripts.insert(identifier.to_string(), script);
        self
    }

    /// Number of searches made for `identifier`
    pub fn search_calls(&self, identifier: &str) -> usize {
        self.search_calls
            .lock()
            .unwrap()
            .get(identifier)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_search_calls(&self) -> usize {
        self.search_calls.lock().unwrap().values().sum()
    }

    /// Highest number of concurrently running searches observed
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn script(&self, identifier: &str) -> Script {
        self.scripts
            .get(identifier)
            .cloned()
            .unwrap_or(Script::Missing)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LookupService for ScriptedLookup {
    async fn search(&self, identifier: &str) -> Result<Vec<String>, LookupError> {
        *self
            .search_calls
            .lock()
            .unwrap()
            .entry(identifier.to_string())
            .or_insert(0) += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let mut script = self.script(identifier);
        while let Script::Slow(delay, inner) = script {
            tokio::time::sleep(delay).await;
            script = *inner;
        }

        match script {
            Script::Found(_) | Script::Dangling => {
                Ok(vec![format!("{}{}", INTERNAL_PREFIX, identifier)])
            }
            Script::Missing => Ok(Vec::new()),
            Script::Broken(reason) => Err(LookupError::Network(reason)),
            Script::Slow(..) => unreachable!(),
        }
    }

    async fn fetch_record(
        &self,
        internal_id: &str,
        _fields: &[RecordField],
    ) -> Result<Option<RawRecord>, LookupError> {
        let identifier = internal_id
            .strip_prefix(INTERNAL_PREFIX)
            .unwrap_or(internal_id);

        let mut script = self.script(identifier);
        while let Script::Slow(_, inner) = script {
            script = *inner;
        }

        match script {
            Script::Found(mut record) => {
                record.internal_id = internal_id.to_string();
                Ok(Some(record))
            }
            _ => Ok(None),
        }
    }
}

/// Minimal record with a title, publisher and year
pub fn record(title: &str, publisher: &str, year: &str) -> RawRecord {
    RawRecord {
        title: Some(title.to_string()),
        publishers: vec![publisher.to_string()],
        publication_dates: vec![year.to_string()],
        ..Default::default()
    }
}
