use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One ingested article record from one source.
///
/// `uid` is a pure function of (source, link, title); the store keys on it,
/// which is what makes re-ingestion of an unchanged feed a no-op.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub uid: String,
    pub topic: String,
    pub source: String,
    pub title: String,
    pub summary: String,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    pub image_url: Option<String>,
    pub language: Option<String>,
    pub paywall: Option<String>,
}

impl Item {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        topic: &str,
        source: &str,
        title: &str,
        summary: &str,
        link: Option<String>,
        published: Option<DateTime<Utc>>,
        fetched_at: DateTime<Utc>,
        image_url: Option<String>,
        language: Option<String>,
        paywall: Option<String>,
    ) -> Self {
        Item {
            uid: stable_id(source, link.as_deref(), title),
            topic: topic.to_string(),
            source: source.to_string(),
            title: title.to_string(),
            summary: summary.to_string(),
            link,
            published,
            fetched_at,
            image_url,
            language,
            paywall,
        }
    }
}

/// Computes the stable fingerprint for a feed entry.
///
/// SHA-256 over source, link, and title joined by `||`. A missing link is
/// treated as an empty string so "no link" has exactly one representation.
/// No case folding and no URL canonicalization: the fingerprint must match
/// what every earlier run of the same feed produced.
pub fn stable_id(source: &str, link: Option<&str>, title: &str) -> String {
    let base = format!("{}||{}||{}", source, link.unwrap_or(""), title);
    let mut hasher = Sha256::new();
    hasher.update(base.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_id_deterministic() {
        let a = stable_id("Example Times", Some("https://ex.com/1"), "A headline");
        let b = stable_id("Example Times", Some("https://ex.com/1"), "A headline");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_stable_id_missing_link_equals_empty_link() {
        let none = stable_id("Example Times", None, "A headline");
        let empty = stable_id("Example Times", Some(""), "A headline");
        assert_eq!(none, empty);
    }

    #[test]
    fn test_stable_id_distinguishes_fields() {
        let base = stable_id("A", Some("https://ex.com/1"), "Title");
        assert_ne!(base, stable_id("B", Some("https://ex.com/1"), "Title"));
        assert_ne!(base, stable_id("A", Some("https://ex.com/2"), "Title"));
        assert_ne!(base, stable_id("A", Some("https://ex.com/1"), "Other"));
    }

    #[test]
    fn test_item_new_fills_uid() {
        let now = Utc::now();
        let item = Item::new(
            "economy",
            "Example Times",
            "Markets rally",
            "Stocks rose broadly.",
            Some("https://ex.com/markets".to_string()),
            None,
            now,
            None,
            Some("en".to_string()),
            None,
        );
        assert_eq!(
            item.uid,
            stable_id("Example Times", Some("https://ex.com/markets"), "Markets rally")
        );
        assert_eq!(item.topic, "economy");
        assert!(item.published.is_none());
    }
}
