//! Concurrent feed ingestion across all configured topics.

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info};

use super::client::{build_client, decode_payload, fetch_feed};
use super::parser::parse_entries;
use super::types::{FetchReport, RawEntry, FETCH_CONCURRENCY};
use crate::config::{SourceConfig, Topic};
use crate::db::Database;
use crate::item::Item;
use crate::TARGET_WEB_REQUEST;

/// Fetch every source of every topic with bounded concurrency. A failing
/// source is reported, never fatal; the order of reports follows
/// completion, not configuration.
pub async fn fetch_all(db: &Database, topics: &[Topic]) -> Result<Vec<FetchReport>> {
    let client = build_client()?;
    let jobs = topics
        .iter()
        .flat_map(|topic| topic.sources.iter().map(move |source| (topic, source)));

    let reports = stream::iter(jobs)
        .map(|(topic, source)| fetch_source(&client, db, topic, source))
        .buffer_unordered(FETCH_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;
    Ok(reports)
}

async fn fetch_source(
    client: &reqwest::Client,
    db: &Database,
    topic: &Topic,
    source: &SourceConfig,
) -> FetchReport {
    match ingest_source(client, db, topic, source).await {
        Ok(report) => report,
        Err(err) => {
            error!(
                target: TARGET_WEB_REQUEST,
                "Source '{}' for topic '{}' failed: {:#}",
                source.name,
                topic.settings.name,
                err
            );
            FetchReport::failed(&topic.settings.name, &source.name, format!("{:#}", err))
        }
    }
}

async fn ingest_source(
    client: &reqwest::Client,
    db: &Database,
    topic: &Topic,
    source: &SourceConfig,
) -> Result<FetchReport> {
    let payload = fetch_feed(client, &source.url).await?;
    let body = decode_payload(&payload, &source.url);
    let entries = parse_entries(&body, &source.url)?;

    let fetched_at = Utc::now();
    let mut inserted = 0;
    for entry in &entries {
        let item = match entry_to_item(&topic.settings.name, source, entry, fetched_at) {
            Some(item) => item,
            None => {
                debug!(target: TARGET_WEB_REQUEST, "Skipping untitled entry from '{}'", source.name);
                continue;
            }
        };
        if db.insert_if_absent(&item).await? {
            inserted += 1;
        }
    }

    info!(
        target: TARGET_WEB_REQUEST,
        "Source '{}' for topic '{}': {} entries, {} new",
        source.name,
        topic.settings.name,
        entries.len(),
        inserted
    );
    Ok(FetchReport {
        topic: topic.settings.name.clone(),
        source: source.name.clone(),
        entries: entries.len(),
        inserted,
        error: None,
    })
}

/// Build an item from a raw entry. Untitled entries carry nothing the
/// engine can use and are dropped here.
fn entry_to_item(
    topic: &str,
    source: &SourceConfig,
    entry: &RawEntry,
    fetched_at: DateTime<Utc>,
) -> Option<Item> {
    if entry.title.trim().is_empty() {
        return None;
    }
    let language = source
        .language
        .clone()
        .or_else(|| detect_language(&entry.title, &entry.summary));
    Some(Item::new(
        topic,
        &source.name,
        &entry.title,
        &entry.summary,
        entry.link.clone(),
        entry.published,
        fetched_at,
        entry.image_url.clone(),
        language,
        source.paywall.clone(),
    ))
}

/// Guess the language of an entry when its source does not declare one.
/// Unreliable guesses are discarded; an unset language only costs the
/// entry its stop-word filtering.
fn detect_language(title: &str, summary: &str) -> Option<String> {
    let sample = format!("{} {}", title, summary);
    whatlang::detect(&sample)
        .filter(|info| info.is_reliable())
        .map(|info| info.lang().code().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn source(language: Option<&str>) -> SourceConfig {
        SourceConfig {
            name: "Example Wire".to_string(),
            url: "https://example.com/feed".to_string(),
            language: language.map(|code| code.to_string()),
            paywall: Some("soft".to_string()),
        }
    }

    fn entry(title: &str, summary: &str) -> RawEntry {
        RawEntry {
            title: title.to_string(),
            link: Some("https://example.com/a".to_string()),
            summary: summary.to_string(),
            published: None,
            image_url: None,
        }
    }

    #[test]
    fn test_entry_to_item_maps_fields() {
        let fetched_at = Utc.with_ymd_and_hms(2026, 8, 20, 12, 0, 0).unwrap();
        let item = entry_to_item(
            "economy",
            &source(Some("en")),
            &entry("Markets rally", "Stocks rose."),
            fetched_at,
        )
        .unwrap();

        assert_eq!(item.topic, "economy");
        assert_eq!(item.source, "Example Wire");
        assert_eq!(item.title, "Markets rally");
        assert_eq!(item.link.as_deref(), Some("https://example.com/a"));
        assert_eq!(item.language.as_deref(), Some("en"));
        assert_eq!(item.paywall.as_deref(), Some("soft"));
        assert_eq!(item.fetched_at, fetched_at);
        assert_eq!(item.uid.len(), 64);
    }

    #[test]
    fn test_entry_to_item_drops_untitled() {
        let fetched_at = Utc::now();
        assert!(entry_to_item("economy", &source(None), &entry("", "body"), fetched_at).is_none());
        assert!(
            entry_to_item("economy", &source(None), &entry("   ", "body"), fetched_at).is_none()
        );
    }

    #[test]
    fn test_entry_to_item_source_language_wins() {
        let item = entry_to_item(
            "wirtschaft",
            &source(Some("de")),
            &entry("Markets rally on earnings", "Stocks rose broadly across the board."),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(item.language.as_deref(), Some("de"));
    }

    #[test]
    fn test_detect_language_on_clear_text() {
        let detected = detect_language(
            "Bundesregierung beschließt neues Gesetz",
            "Die Bundesregierung hat am Donnerstag ein neues Gesetz zur Förderung erneuerbarer \
             Energien beschlossen und damit die Weichen für den Ausbau gestellt.",
        );
        assert_eq!(detected.as_deref(), Some("deu"));

        let detected = detect_language(
            "Council approves transit plan",
            "The city council voted on Thursday to approve a sweeping transit expansion plan \
             that will add new bus lines across the city.",
        );
        assert_eq!(detected.as_deref(), Some("eng"));
    }
}
