//! Turns raw record text into entity-store keys
//!
//! All functions are pure.

use crate::models::RawRecord;
use regex::Regex;
use std::sync::OnceLock;

/// Role annotation the catalogue appends to author strings ("author")
pub const ROLE_KEYWORD: &str = "kirjoittaja";

/// `Surname, Given[, birth[-death]]`
///
/// - `^([^,]+,[^,]+)`: name, the first two comma-separated segments
/// - `(?:,\s*([0-9]{1,4})`: optional birth year after a third comma
/// - `(?:-([0-9]{1,4}))?)?`: optional death year right after a hyphen
const AUTHOR_PATTERN: &str = r"^([^,]+,[^,]+)(?:,\s*([0-9]{1,4})(?:-([0-9]{1,4}))?)?";

fn author_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(AUTHOR_PATTERN).expect("author pattern is valid"))
}

fn role_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!("(?i){}", regex::escape(ROLE_KEYWORD))).expect("role pattern is valid")
    })
}

/// Parsed author string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorName {
    pub name: String,
    pub birth_year: Option<String>,
    pub death_year: Option<String>,
}

/// Split an author string into name and optional life years
///
/// When the pattern does not match, the whole string is the name. The role
/// keyword is removed from the name in either case.
pub fn parse_author(entry: &str) -> AuthorName {
    let (name, birth_year, death_year) = match author_regex().captures(entry) {
        Some(caps) => {
            let name = caps.get(1).map_or(entry, |m| m.as_str()).trim();
            let birth = caps.get(2).map(|m| m.as_str().trim().to_string());
            let death = birth
                .as_ref()
                .and(caps.get(3))
                .map(|m| m.as_str().trim().to_string());
            (name, birth, death)
        }
        None => (entry, None, None),
    };

    AuthorName {
        name: role_regex().replace_all(name, "").trim().to_string(),
        birth_year,
        death_year,
    }
}

/// Strip semicolons and trailing whitespace
pub fn sanitize(entry: &str) -> String {
    entry.replace(';', "").trim_end().to_string()
}

/// Author names ready for the author table, empty names dropped
pub fn author_keys(record: &RawRecord) -> Vec<AuthorName> {
    record
        .authors
        .iter()
        .map(|raw| {
            let mut author = parse_author(raw);
            author.name = sanitize(&author.name);
            author
        })
        .filter(|author| !author.name.is_empty())
        .collect()
}

/// First publisher, sanitised
pub fn publisher_key(record: &RawRecord) -> Option<String> {
    record
        .publisher()
        .map(sanitize)
        .filter(|name| !name.is_empty())
}

/// Every phrase of every subject group as its own topic
///
/// Commas inside a phrase are removed, not treated as delimiters.
pub fn topic_keys(record: &RawRecord) -> Vec<String> {
    record
        .subjects
        .iter()
        .flatten()
        .map(|phrase| sanitize(&phrase.replace(',', "")))
        .filter(|topic| !topic.is_empty())
        .collect()
}

/// Genre codes, or the unknown-genre description when there are none
pub fn genre_keys(record: &RawRecord, unknown_genre: &str) -> Vec<String> {
    let codes: Vec<String> = record
        .genre_codes
        .iter()
        .map(|code| sanitize(code).trim().to_string())
        .filter(|code| !code.is_empty())
        .collect();

    if codes.is_empty() {
        vec![unknown_genre.to_string()]
    } else {
        codes
    }
}
