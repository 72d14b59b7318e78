use chrono::{DateTime, Utc};
use rand::Rng;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, instrument};

use super::core::{Database, DbLockErrorExt};
use crate::item::Item;
use crate::TARGET_DB;

/// One row of the per-topic store summary.
#[derive(Debug)]
pub struct TopicStats {
    pub topic: String,
    pub items: i64,
    pub sources: i64,
    pub newest: Option<String>,
}

impl Database {
    /// Inserts an item unless its uid is already present. Returns true iff
    /// a row was written; a duplicate is a no-op, not an error. Lock
    /// contention from concurrent feed ingestion is retried with backoff.
    #[instrument(target = "db_query", level = "debug", skip(self, item))]
    pub async fn insert_if_absent(&self, item: &Item) -> Result<bool, sqlx::Error> {
        let published = item.published.map(|ts| ts.to_rfc3339());
        let fetched_at = item.fetched_at.to_rfc3339();

        let mut backoff = 100; // initial delay in milliseconds
        let max_retries = 5;

        for attempt in 1..=max_retries {
            let result = sqlx::query(
                r#"
                INSERT INTO items (uid, topic, source, title, link, summary, published, language, paywall, image_url, fetched_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ON CONFLICT(uid) DO NOTHING
                "#,
            )
            .bind(&item.uid)
            .bind(&item.topic)
            .bind(&item.source)
            .bind(&item.title)
            .bind(&item.link)
            .bind(&item.summary)
            .bind(&published)
            .bind(&item.language)
            .bind(&item.paywall)
            .bind(&item.image_url)
            .bind(&fetched_at)
            .execute(self.pool())
            .await;

            match result {
                Ok(outcome) => {
                    let inserted = outcome.rows_affected() > 0;
                    debug!(
                        target: TARGET_DB,
                        "Item {}: {}",
                        &item.uid[..12],
                        if inserted { "inserted" } else { "already seen" }
                    );
                    return Ok(inserted);
                }
                Err(err) if err.is_database_lock_error() => {
                    info!(
                        target: TARGET_DB,
                        "Database is locked, waiting {}ms before retrying attempt {}/{}",
                        backoff, attempt, max_retries
                    );
                    sleep(Duration::from_millis(backoff)).await;
                    // Exponential backoff with jitter.
                    backoff = backoff.saturating_mul(2) + rand::rng().random_range(0..100);
                }
                Err(err) => {
                    error!(target: TARGET_DB, "Failed to insert item {}: {}", item.uid, err);
                    return Err(err);
                }
            }
        }

        Err(sqlx::Error::Protocol(
            "Maximum retries exceeded inserting item".into(),
        ))
    }

    /// Newest items for one topic, `fetched_at` descending. Ties fall back
    /// to uid so the order is reproducible run to run.
    #[instrument(target = "db_query", level = "debug", skip(self))]
    pub async fn latest_items(&self, topic: &str, limit: usize) -> Result<Vec<Item>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT uid, topic, source, title, link, summary, published, language, paywall, image_url, fetched_at
            FROM items
            WHERE topic = ?1
            ORDER BY fetched_at DESC, uid
            LIMIT ?2
            "#,
        )
        .bind(topic)
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(row_to_item).collect()
    }

    /// Topics present in the store, alphabetical.
    pub async fn topics(&self) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT DISTINCT topic FROM items ORDER BY topic")
            .fetch_all(self.pool())
            .await
    }

    /// Per-topic row counts for the stats command.
    pub async fn topic_stats(&self) -> Result<Vec<TopicStats>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT topic,
                   COUNT(*) AS items,
                   COUNT(DISTINCT source) AS sources,
                   MAX(fetched_at) AS newest
            FROM items
            GROUP BY topic
            ORDER BY topic
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| {
                Ok(TopicStats {
                    topic: row.try_get("topic")?,
                    items: row.try_get("items")?,
                    sources: row.try_get("sources")?,
                    newest: row.try_get("newest")?,
                })
            })
            .collect()
    }
}

fn row_to_item(row: &SqliteRow) -> Result<Item, sqlx::Error> {
    let published: Option<String> = row.try_get("published")?;
    let fetched_at: String = row.try_get("fetched_at")?;
    Ok(Item {
        uid: row.try_get("uid")?,
        topic: row.try_get("topic")?,
        source: row.try_get("source")?,
        title: row.try_get("title")?,
        link: row.try_get("link")?,
        summary: row.try_get("summary")?,
        published: published.as_deref().and_then(parse_timestamp),
        language: row.try_get("language")?,
        paywall: row.try_get("paywall")?,
        image_url: row.try_get("image_url")?,
        fetched_at: parse_timestamp(&fetched_at).ok_or_else(|| {
            sqlx::Error::Decode(format!("invalid fetched_at '{}'", fetched_at).into())
        })?,
    })
}

// Timestamps are stored as RFC 3339 TEXT, which also makes them sort
// correctly in SQL.
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn open() -> Database {
        Database::new(":memory:").await.unwrap()
    }

    fn sample(topic: &str, source: &str, title: &str, hour: u32) -> Item {
        let fetched = Utc.with_ymd_and_hms(2026, 8, 20, hour, 0, 0).unwrap();
        Item::new(
            topic,
            source,
            title,
            "A summary.",
            Some(format!("https://ex.com/{}", title.replace(' ', "-"))),
            Some(fetched - chrono::Duration::minutes(30)),
            fetched,
            None,
            Some("en".to_string()),
            None,
        )
    }

    #[tokio::test]
    async fn test_insert_if_absent_is_idempotent() {
        let db = open().await;
        let item = sample("economy", "A", "Markets rally", 9);
        assert!(db.insert_if_absent(&item).await.unwrap());
        assert!(!db.insert_if_absent(&item).await.unwrap());

        let stored = db.latest_items("economy", 10).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_round_trip_preserves_fields() {
        let db = open().await;
        let mut item = sample("economy", "A", "Markets rally", 9);
        item.image_url = Some("https://ex.com/pic.jpg".to_string());
        db.insert_if_absent(&item).await.unwrap();

        let stored = db.latest_items("economy", 10).await.unwrap();
        assert_eq!(stored, vec![item]);
    }

    #[tokio::test]
    async fn test_null_published_round_trips() {
        let db = open().await;
        let mut item = sample("economy", "A", "No date given", 9);
        item.published = None;
        db.insert_if_absent(&item).await.unwrap();

        let stored = db.latest_items("economy", 10).await.unwrap();
        assert!(stored[0].published.is_none());
    }

    #[tokio::test]
    async fn test_latest_items_newest_first_with_limit() {
        let db = open().await;
        for (title, hour) in [("early", 8), ("late", 15), ("midday", 12)] {
            db.insert_if_absent(&sample("economy", "A", title, hour))
                .await
                .unwrap();
        }
        db.insert_if_absent(&sample("sport", "B", "other topic", 20))
            .await
            .unwrap();

        let stored = db.latest_items("economy", 2).await.unwrap();
        let titles: Vec<&str> = stored.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["late", "midday"]);
    }

    #[tokio::test]
    async fn test_topics_and_stats() {
        let db = open().await;
        db.insert_if_absent(&sample("economy", "A", "one", 9))
            .await
            .unwrap();
        db.insert_if_absent(&sample("economy", "B", "two", 10))
            .await
            .unwrap();
        db.insert_if_absent(&sample("sport", "A", "three", 11))
            .await
            .unwrap();

        assert_eq!(db.topics().await.unwrap(), vec!["economy", "sport"]);

        let stats = db.topic_stats().await.unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].topic, "economy");
        assert_eq!(stats[0].items, 2);
        assert_eq!(stats[0].sources, 2);
        assert!(stats[0].newest.is_some());
    }
}
