//! Store file line parsing

use super::FIELD_DELIMITER;
use crate::error::StoreError;
use std::path::Path;

/// One non-blank line of a store file
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct StoreLine<'a> {
    pub key: &'a str,
    pub name: &'a str,
}

/// Split a file's content into key/name pairs, skipping blank lines
///
/// Only the first delimiter separates the columns; the name may contain
/// further delimiters. A line without any delimiter yields an empty name.
pub(crate) fn parse_lines(content: &str) -> Vec<(usize, StoreLine<'_>)> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            let line = line.trim_end_matches('\r');
            let (key, name) = match line.split_once(FIELD_DELIMITER) {
                Some((key, name)) => (key.trim(), name),
                None => (line.trim(), ""),
            };
            (idx + 1, StoreLine { key, name })
        })
        .collect()
}

/// Parse a numeric ID column
pub(crate) fn parse_id(path: &Path, line_no: usize, line: &StoreLine<'_>) -> Result<u64, StoreError> {
    line.key.parse::<u64>().map_err(|_| StoreError::Corrupt {
        path: path.to_path_buf(),
        line: line_no,
        content: format!("{}{}{}", line.key, FIELD_DELIMITER, line.name),
    })
}

/// Render one store line, newline included
pub(crate) fn render_line(key: &str, name: &str) -> String {
    format!("{}{}{}\n", key, FIELD_DELIMITER, name)
}

/// Case-insensitive index key
pub(crate) fn index_key(name: &str) -> String {
    name.to_lowercase()
}

/// Line breaks would split one record over several lines
pub(crate) fn single_line(name: &str) -> String {
    name.replace(['\r', '\n'], " ")
}
