//! Entity store test utilities

use std::path::Path;

/// Write a store file with the given `id|name` lines
pub fn seed_store(folder: &Path, file_name: &str, lines: &[&str]) {
    let mut content = lines.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    std::fs::write(folder.join(file_name), content).unwrap();
}

/// Non-empty lines of a file, or nothing when it does not exist
pub fn read_lines(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => content
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => Vec::new(),
    }
}
