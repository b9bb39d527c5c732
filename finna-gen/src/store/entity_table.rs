//! Surrogate-key entity table (authors, publishers, topics)

use super::line::{index_key, parse_id, parse_lines, render_line, single_line};
use super::EntityKind;
use crate::error::StoreError;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Result of [`EntityTable::resolve_or_create`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub id: u64,
    /// True when this call appended a new entry
    pub created: bool,
}

#[derive(Debug, Default)]
struct TableState {
    /// Lowercased name → id; the first entry on file wins
    index: HashMap<String, u64>,
    max_id: u64,
    entries: usize,
}

/// File-backed name → id table for one entity kind
///
/// All operations go through one async mutex, so a lookup followed by an
/// append can never interleave with another caller's lookup for the same
/// kind. Entries are never rewritten or removed.
#[derive(Debug)]
pub struct EntityTable {
    kind: EntityKind,
    path: PathBuf,
    state: Mutex<TableState>,
}

impl EntityTable {
    /// Open the table, rehydrating the index from `path`
    ///
    /// A missing file is an empty table. Any other read failure, or a line
    /// whose id column is not a number, is an error.
    pub async fn open(kind: EntityKind, path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut state = TableState::default();

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                for (line_no, line) in parse_lines(&content) {
                    let id = parse_id(&path, line_no, &line)?;
                    state.index.entry(index_key(line.name)).or_insert(id);
                    state.max_id = state.max_id.max(id);
                    state.entries += 1;
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(kind = %kind, path = %path.display(), "Store file absent, starting empty");
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        }

        info!(
            kind = %kind,
            entries = state.entries,
            max_id = state.max_id,
            "Entity table loaded"
        );

        Ok(Self {
            kind,
            path,
            state: Mutex::new(state),
        })
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Case-insensitive exact match on name
    pub async fn lookup(&self, name: &str) -> Option<u64> {
        let state = self.state.lock().await;
        state.index.get(&index_key(&single_line(name))).copied()
    }

    /// `max(existing ids) + 1`, or `1` for an empty table
    pub async fn next_id(&self) -> u64 {
        self.state.lock().await.max_id + 1
    }

    /// Number of entries on file
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Append one `id|name` entry
    pub async fn append(&self, id: u64, name: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        self.append_locked(&mut state, id, &single_line(name)).await
    }

    /// Look the name up; on a miss assign `next_id` and append it
    ///
    /// The whole step runs under the table lock.
    pub async fn resolve_or_create(&self, name: &str) -> Result<Resolution, StoreError> {
        let name = single_line(name);
        let key = index_key(&name);
        let mut state = self.state.lock().await;

        if let Some(&id) = state.index.get(&key) {
            return Ok(Resolution { id, created: false });
        }

        let id = state.max_id + 1;
        self.append_locked(&mut state, id, &name).await?;
        debug!(kind = %self.kind, id, name = %name, "New entity");

        Ok(Resolution { id, created: true })
    }

    async fn append_locked(
        &self,
        state: &mut TableState,
        id: u64,
        name: &str,
    ) -> Result<(), StoreError> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;

        file.write_all(render_line(&id.to_string(), name).as_bytes())
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.flush().await.map_err(|e| StoreError::io(&self.path, e))?;

        state.index.entry(index_key(name)).or_insert(id);
        state.max_id = state.max_id.max(id);
        state.entries += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_first_entry_on_file_wins() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("topics.txt");
        std::fs::write(&path, "3|Runous\n9|runous\n").unwrap();

        let table = EntityTable::open(EntityKind::Topic, &path).await.unwrap();
        assert_eq!(table.lookup("RUNOUS").await, Some(3));
        assert_eq!(table.next_id().await, 10);
        assert_eq!(table.len().await, 2);
    }

    #[tokio::test]
    async fn test_line_breaks_in_name_stay_on_one_line() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("topics.txt");
        let table = EntityTable::open(EntityKind::Topic, &path).await.unwrap();

        let res = table.resolve_or_create("kaksi\nriviä").await.unwrap();
        assert!(res.created);
        assert_eq!(table.lookup("kaksi riviä").await, Some(res.id));

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "1|kaksi riviä\n");
    }
}
