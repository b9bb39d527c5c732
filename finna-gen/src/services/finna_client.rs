//! Finna API client
//!
//! Implements [`LookupService`] over the public Finna REST API:
//! - search: `GET {base}/search?lookfor={identifier}`
//! - record: `GET {base}/record?id={id}&field[]=...&prettyPrint=0`
//!
//! Record parsing is tolerant per field: a missing or wrongly typed field
//! becomes an absent value, never a whole-record failure.

use crate::error::LookupError;
use crate::models::RawRecord;
use crate::services::lookup::{LookupService, RecordField};
use async_trait::async_trait;
use finna_common::config::LookupConfig;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde_json::{Map, Value};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

const RECORDS_KEY: &str = "records";
const ID_KEY: &str = "id";
const TITLE_KEY: &str = "title";
const AUTHORS_KEY: &str = "authors";
const PRIMARY_AUTHORS_KEY: &str = "primary";
const SECONDARY_AUTHORS_KEY: &str = "secondary";
const CLASSIFICATIONS_KEY: &str = "classifications";
const YKL_KEY: &str = "ykl";
const SUBJECTS_KEY: &str = "subjects";
const PUBLISHERS_KEY: &str = "publishers";
const PUBLICATION_DATES_KEY: &str = "publicationDates";
const LANGUAGES_KEY: &str = "languages";
const SUMMARY_KEY: &str = "summary";

type DirectRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Finna API client
///
/// One instance is shared by every block task; the rate limiter bounds the
/// combined request rate of all of them.
pub struct FinnaClient {
    client: Client,
    base_url: String,
    rate_limiter: DirectRateLimiter,
}

impl FinnaClient {
    pub fn new(config: &LookupConfig) -> Result<Self, LookupError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rate_limiter,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, LookupError> {
        self.rate_limiter.until_ready().await;

        debug!(url = %url, "Querying Finna API");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::Api(status.as_u16(), body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| LookupError::Parse(e.to_string()))
    }
}

#[async_trait]
impl LookupService for FinnaClient {
    async fn search(&self, identifier: &str) -> Result<Vec<String>, LookupError> {
        let url = format!("{}/search", self.base_url);
        let response = self.get_json(&url, &[("lookfor", identifier)]).await?;
        Ok(parse_candidate_ids(&response))
    }

    async fn fetch_record(
        &self,
        internal_id: &str,
        fields: &[RecordField],
    ) -> Result<Option<RawRecord>, LookupError> {
        let url = format!("{}/record", self.base_url);
        let mut query: Vec<(&str, &str)> = Vec::with_capacity(fields.len() + 2);
        query.push(("id", internal_id));
        query.extend(fields.iter().map(|f| ("field[]", f.as_str())));
        query.push(("prettyPrint", "0"));

        let response = match self.get_json(&url, &query).await {
            Ok(response) => response,
            Err(LookupError::Api(404, _)) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(first_record(&response).map(|record| parse_record(internal_id, record)))
    }
}

// ============================================================================
// Response parsing
// ============================================================================

/// `records[*].id` in response order
pub fn parse_candidate_ids(response: &Value) -> Vec<String> {
    response
        .get(RECORDS_KEY)
        .and_then(Value::as_array)
        .map(|records| {
            records
                .iter()
                .filter_map(|r| r.get(ID_KEY).and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// First element of `records`, if it is an object
pub fn first_record(response: &Value) -> Option<&Map<String, Value>> {
    response
        .get(RECORDS_KEY)
        .and_then(Value::as_array)
        .and_then(|records| records.first())
        .and_then(Value::as_object)
}

/// Build a [`RawRecord`] from one Finna record object
pub fn parse_record(internal_id: &str, record: &Map<String, Value>) -> RawRecord {
    RawRecord {
        internal_id: record
            .get(ID_KEY)
            .and_then(Value::as_str)
            .unwrap_or(internal_id)
            .to_string(),
        title: field_string(record, TITLE_KEY),
        authors: parse_authors(record),
        genre_codes: record
            .get(CLASSIFICATIONS_KEY)
            .and_then(|c| c.get(YKL_KEY))
            .map(string_list)
            .unwrap_or_else(|| absent(CLASSIFICATIONS_KEY)),
        subjects: parse_subjects(record),
        publishers: field_list(record, PUBLISHERS_KEY),
        publication_dates: field_list(record, PUBLICATION_DATES_KEY),
        languages: field_list(record, LANGUAGES_KEY),
        summary: match record.get(SUMMARY_KEY) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Array(items)) => items.iter().find_map(|v| v.as_str()).map(str::to_string),
            _ => None,
        },
    }
}

/// Primary author names; secondary ones when there are no primary authors
fn parse_authors(record: &Map<String, Value>) -> Vec<String> {
    let authors = match record.get(AUTHORS_KEY).and_then(Value::as_object) {
        Some(a) => a,
        None => return absent(AUTHORS_KEY),
    };

    [PRIMARY_AUTHORS_KEY, SECONDARY_AUTHORS_KEY]
        .iter()
        .filter_map(|key| authors.get(*key).and_then(Value::as_object))
        .find(|group| !group.is_empty())
        .map(|group| group.keys().cloned().collect())
        .unwrap_or_default()
}

fn parse_subjects(record: &Map<String, Value>) -> Vec<Vec<String>> {
    match record.get(SUBJECTS_KEY).and_then(Value::as_array) {
        Some(groups) => groups
            .iter()
            .map(|group| match group {
                Value::Array(_) => string_list(group),
                Value::String(s) => vec![s.clone()],
                _ => Vec::new(),
            })
            .filter(|group| !group.is_empty())
            .collect(),
        None => absent(SUBJECTS_KEY),
    }
}

fn field_string(record: &Map<String, Value>, key: &str) -> Option<String> {
    let value = record.get(key).and_then(Value::as_str).map(str::to_string);
    if value.is_none() {
        debug!(field = key, "Record field missing or not a string");
    }
    value
}

fn field_list(record: &Map<String, Value>, key: &str) -> Vec<String> {
    record
        .get(key)
        .map(string_list)
        .unwrap_or_else(|| absent(key))
}

/// String elements of an array; numbers are kept in their textual form
fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn absent<T: Default>(key: &str) -> T {
    debug!(field = key, "Record field missing");
    T::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_candidate_ids_keep_ranking() {
        let response = json!({
            "resultCount": 2,
            "records": [{"id": "helmet.1"}, {"id": "anders.2"}, {"title": "no id"}],
            "status": "OK"
        });
        assert_eq!(parse_candidate_ids(&response), vec!["helmet.1", "anders.2"]);
        assert!(parse_candidate_ids(&json!({"resultCount": 0, "status": "OK"})).is_empty());
    }

    #[test]
    fn test_parse_full_record() {
        let response = json!({
            "records": [{
                "id": "helmet.1234",
                "title": "Pelon valtakunta",
                "authors": {
                    "primary": {
                        "Leary, Timothy Francis, 1920-1996, kirjoittaja": {"role": ["kirjoittaja"]},
                        "Ginsberg, Allen, kirjoittaja": {"role": ["kirjoittaja"]}
                    },
                    "secondary": {"Forss, Timo Kalevi, 1967- kirjoittaja": {}},
                    "corporate": []
                },
                "publishers": ["Like"],
                "publicationDates": ["2006"],
                "classifications": {"ykl": ["30.1", "84.2"]},
                "subjects": [["psykedelia"], ["huumeet", "historia"]],
                "languages": ["fin"],
                "summary": ["Kirja kertoo..."]
            }]
        });

        let record = parse_record("fallback", first_record(&response).unwrap());
        assert_eq!(record.internal_id, "helmet.1234");
        assert_eq!(record.title.as_deref(), Some("Pelon valtakunta"));
        assert_eq!(
            record.authors,
            vec![
                "Leary, Timothy Francis, 1920-1996, kirjoittaja",
                "Ginsberg, Allen, kirjoittaja"
            ]
        );
        assert_eq!(record.genre_codes, vec!["30.1", "84.2"]);
        assert_eq!(record.subjects.len(), 2);
        assert_eq!(record.subjects[1], vec!["huumeet", "historia"]);
        assert_eq!(record.publisher(), Some("Like"));
        assert_eq!(record.release_year(), Some("2006"));
        assert_eq!(record.languages, vec!["fin"]);
        assert_eq!(record.summary.as_deref(), Some("Kirja kertoo..."));
    }

    #[test]
    fn test_secondary_authors_used_when_no_primary() {
        let record = json!({
            "authors": {"primary": {}, "secondary": {"Forss, Timo Kalevi, 1967- kirjoittaja": {}}}
        });
        let parsed = parse_record("x", record.as_object().unwrap());
        assert_eq!(parsed.authors, vec!["Forss, Timo Kalevi, 1967- kirjoittaja"]);
    }

    #[test]
    fn test_malformed_fields_are_absent_not_fatal() {
        let record = json!({
            "title": 42,
            "authors": "not an object",
            "publishers": {"name": "Otava"},
            "classifications": {"udk": ["1"]},
            "subjects": "oops"
        });
        let parsed = parse_record("finna.9", record.as_object().unwrap());
        assert_eq!(parsed.internal_id, "finna.9");
        assert!(parsed.title.is_none());
        assert!(parsed.authors.is_empty());
        assert!(parsed.publishers.is_empty());
        assert!(parsed.genre_codes.is_empty());
        assert!(parsed.subjects.is_empty());
        assert!(parsed.summary.is_none());
    }

    #[test]
    fn test_client_builds_from_default_config() {
        let client = FinnaClient::new(&LookupConfig::default()).unwrap();
        assert_eq!(client.base_url(), "https://api.finna.fi/v1");
    }
}
