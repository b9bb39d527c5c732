//! Input, output and retry-list files

use crate::models::SkippedIdentifier;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// One identifier per line; lines are trimmed and blank lines skipped
pub fn parse_identifiers(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub async fn read_identifiers(path: &Path) -> std::io::Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path).await?;
    let identifiers = parse_identifiers(&content);
    info!(path = %path.display(), count = identifiers.len(), "Read identifiers");
    Ok(identifiers)
}

/// Appends rendered statements to the insert file
pub struct StatementSink {
    path: PathBuf,
    written: usize,
}

impl StatementSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Statements written through this sink so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub async fn append(&mut self, statements: &[String]) -> std::io::Result<()> {
        if statements.is_empty() {
            return Ok(());
        }

        let mut buf = String::new();
        for statement in statements {
            buf.push_str(statement);
            buf.push('\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(buf.as_bytes()).await?;
        file.flush().await?;

        self.written += statements.len();
        Ok(())
    }
}

/// Write `identifier<TAB>kind` lines, replacing any previous retry list
pub async fn write_failures(path: &Path, failures: &[SkippedIdentifier]) -> std::io::Result<()> {
    let content: String = failures
        .iter()
        .map(|f| format!("{}\t{}\n", f.identifier, f.kind))
        .collect();
    tokio::fs::write(path, content).await?;
    info!(path = %path.display(), count = failures.len(), "Wrote retry list");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use finna_common::events::OutcomeKind;
    use tempfile::TempDir;

    #[test]
    fn test_parse_identifiers_skips_blank_lines() {
        let content = "978-952-483-142-0\n\n  0-914171-77-1  \r\n\t\n9789520102814";
        assert_eq!(
            parse_identifiers(content),
            vec!["978-952-483-142-0", "0-914171-77-1", "9789520102814"]
        );
    }

    #[tokio::test]
    async fn test_sink_appends_across_runs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dbOutput.txt");

        let mut first = StatementSink::new(&path);
        first.append(&["A;".to_string(), "B;".to_string()]).await.unwrap();
        let mut second = StatementSink::new(&path);
        second.append(&["C;".to_string()]).await.unwrap();

        assert_eq!(first.written(), 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "A;\nB;\nC;\n");
    }

    #[tokio::test]
    async fn test_failures_file_lists_identifier_and_kind() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("failed.txt");
        let failures = vec![
            SkippedIdentifier {
                position: 1,
                identifier: "B".into(),
                kind: OutcomeKind::NotFound,
            },
            SkippedIdentifier {
                position: 4,
                identifier: "E".into(),
                kind: OutcomeKind::TimedOut,
            },
        ];
        write_failures(&path, &failures).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "B\tnot_found\nE\ttimed_out\n"
        );
    }
}
