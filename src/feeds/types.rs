//! Shared types and constants for feed fetching.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Hard ceiling on a single feed request, connection setup included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Pause before retrying a failing feed.
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Attempts per feed before giving up for this run.
pub const MAX_RETRIES: usize = 3;

/// Upper bound on feeds fetched concurrently.
pub const FETCH_CONCURRENCY: usize = 8;

/// One entry as it came out of a feed, before ingestion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub title: String,
    pub link: Option<String>,
    pub summary: String,
    pub published: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
}

/// Raw response body of a feed request together with the headers
/// needed to interpret it.
#[derive(Debug, Clone)]
pub struct FeedPayload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
}

/// Outcome of ingesting one configured source.
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub topic: String,
    pub source: String,
    pub entries: usize,
    pub inserted: usize,
    pub error: Option<String>,
}

impl FetchReport {
    pub fn failed(topic: &str, source: &str, error: String) -> Self {
        Self {
            topic: topic.to_string(),
            source: source.to_string(),
            entries: 0,
            inserted: 0,
            error: Some(error),
        }
    }
}
