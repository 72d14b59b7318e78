//! feeds.yml loading, validation, and per-topic settings resolution.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use url::Url;

use crate::engine::normalize::{self, Language};

/// Raw shape of feeds.yml. Topic names map to their sources and optional
/// overrides; `defaults` carries the engine knobs every topic inherits.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedsConfig {
    pub defaults: Defaults,
    pub topics: BTreeMap<String, TopicConfig>,
}

/// The clustering-relevant values are deliberately not serde defaults:
/// a forgotten threshold must fail loudly at startup, not shift cluster
/// boundaries quietly.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    pub threshold: Option<f32>,
    pub per_source_cap: Option<usize>,
    pub total_cap: Option<usize>,
    pub page_size: Option<usize>,
    pub max_pages: Option<usize>,
    #[serde(default = "default_snippet_budget")]
    pub snippet_budget: usize,
    #[serde(default = "default_max_snippets")]
    pub max_snippets: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopicConfig {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub threshold: Option<f32>,
    #[serde(default)]
    pub stop_words: Vec<String>,
    pub sources: Vec<SourceConfig>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub paywall: Option<String>,
}

/// One topic after validation: effective engine settings plus its sources.
#[derive(Clone, Debug)]
pub struct Topic {
    pub settings: TopicSettings,
    pub sources: Vec<SourceConfig>,
}

/// Effective per-topic engine settings after merging `defaults`. Passed
/// explicitly into every pipeline invocation.
#[derive(Clone, Debug)]
pub struct TopicSettings {
    pub name: String,
    pub slug: String,
    pub language: Language,
    pub threshold: f32,
    pub stop_words: HashSet<String>,
    pub per_source_cap: usize,
    pub total_cap: usize,
    pub page_size: usize,
    pub max_pages: usize,
    pub snippet_budget: usize,
    pub max_snippets: usize,
}

fn default_snippet_budget() -> usize {
    180
}

fn default_max_snippets() -> usize {
    3
}

/// Reads and validates feeds.yml. Every error here is fatal to startup.
pub fn load(path: &Path) -> Result<Vec<Topic>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading feed configuration {}", path.display()))?;
    let config: FeedsConfig = serde_yaml::from_str(&text)
        .with_context(|| format!("parsing feed configuration {}", path.display()))?;
    config.resolve()
}

impl FeedsConfig {
    /// Validates the raw file and produces effective per-topic settings.
    /// Missing or out-of-range values are errors; nothing falls back
    /// silently.
    pub fn resolve(&self) -> Result<Vec<Topic>> {
        let default_threshold = match self.defaults.threshold {
            Some(t) => validate_threshold(t, "defaults.threshold")?,
            None => bail!("defaults.threshold is required"),
        };
        let per_source_cap =
            require_positive(self.defaults.per_source_cap, "defaults.per_source_cap")?;
        let total_cap = require_positive(self.defaults.total_cap, "defaults.total_cap")?;
        if total_cap < per_source_cap {
            bail!(
                "defaults.total_cap ({}) must be at least defaults.per_source_cap ({})",
                total_cap,
                per_source_cap
            );
        }
        let page_size = require_positive(self.defaults.page_size, "defaults.page_size")?;
        let max_pages = require_positive(self.defaults.max_pages, "defaults.max_pages")?;
        if self.defaults.snippet_budget == 0 {
            bail!("defaults.snippet_budget must be at least 1");
        }
        if self.defaults.max_snippets == 0 {
            bail!("defaults.max_snippets must be at least 1");
        }
        if self.topics.is_empty() {
            bail!("no topics configured");
        }

        let mut topics = Vec::with_capacity(self.topics.len());
        for (name, topic) in &self.topics {
            if topic.sources.is_empty() {
                bail!("topic '{}' has no sources", name);
            }
            for source in &topic.sources {
                if source.name.trim().is_empty() {
                    bail!("topic '{}' has a source without a name", name);
                }
                let parsed = Url::parse(&source.url).with_context(|| {
                    format!(
                        "topic '{}', source '{}': invalid feed url '{}'",
                        name, source.name, source.url
                    )
                })?;
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    bail!(
                        "topic '{}', source '{}': feed url must be http or https",
                        name,
                        source.name
                    );
                }
            }

            let threshold = match topic.threshold {
                Some(t) => validate_threshold(t, &format!("topics.{}.threshold", name))?,
                None => default_threshold,
            };
            let language = Language::from_code(topic.language.as_deref().unwrap_or("en"));
            let mut stop_words: HashSet<String> = normalize::default_stop_words(language)
                .iter()
                .map(|word| word.to_string())
                .collect();
            for word in &topic.stop_words {
                // Extras are folded the same way tokens are, so they match.
                let folded = normalize::normalize_text(word, language);
                if !folded.is_empty() {
                    stop_words.insert(folded);
                }
            }

            topics.push(Topic {
                settings: TopicSettings {
                    name: name.clone(),
                    slug: slugify(name),
                    language,
                    threshold,
                    stop_words,
                    per_source_cap,
                    total_cap,
                    page_size,
                    max_pages,
                    snippet_budget: self.defaults.snippet_budget,
                    max_snippets: self.defaults.max_snippets,
                },
                sources: topic.sources.clone(),
            });
        }
        Ok(topics)
    }
}

fn validate_threshold(value: f32, what: &str) -> Result<f32> {
    if !(value > 0.0 && value <= 1.0) {
        bail!("{} must be within (0, 1], got {}", what, value);
    }
    Ok(value)
}

fn require_positive(value: Option<usize>, what: &str) -> Result<usize> {
    match value {
        Some(v) if v >= 1 => Ok(v),
        Some(_) => bail!("{} must be at least 1", what),
        None => bail!("{} is required", what),
    }
}

/// Filesystem-safe page identity for a topic name.
pub fn slugify(name: &str) -> String {
    let replaced: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let parts: Vec<&str> = replaced.split('-').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        "topic".to_string()
    } else {
        parts.join("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
defaults:
  threshold: 0.55
  per_source_cap: 3
  total_cap: 40
  page_size: 8
  max_pages: 5
topics:
  Economy:
    stop_words: [markets]
    sources:
      - name: Example Times
        url: https://example.com/rss
  Wirtschaft:
    language: de
    threshold: 0.45
    stop_words: [Börse]
    sources:
      - name: Beispiel Zeitung
        url: https://beispiel.de/feed
        paywall: soft
"#;

    fn parse(yaml: &str) -> FeedsConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_valid_config_resolves() {
        let topics = parse(VALID).resolve().unwrap();
        assert_eq!(topics.len(), 2);

        let economy = &topics[0].settings;
        assert_eq!(economy.name, "Economy");
        assert_eq!(economy.slug, "economy");
        assert_eq!(economy.language, Language::English);
        assert_eq!(economy.threshold, 0.55);
        assert_eq!(economy.per_source_cap, 3);
        assert_eq!(economy.snippet_budget, 180);
        assert!(economy.stop_words.contains("the"));
        assert!(economy.stop_words.contains("markets"));

        let wirtschaft = &topics[1].settings;
        assert_eq!(wirtschaft.language, Language::German);
        assert_eq!(wirtschaft.threshold, 0.45);
        assert!(wirtschaft.stop_words.contains("und"));
        // Per-topic extras are folded like tokens.
        assert!(wirtschaft.stop_words.contains("boerse"));
        assert_eq!(topics[1].sources[0].paywall.as_deref(), Some("soft"));
    }

    #[test]
    fn test_missing_threshold_is_fatal() {
        let yaml = r#"
defaults:
  per_source_cap: 3
  total_cap: 40
  page_size: 8
  max_pages: 5
topics:
  t:
    sources:
      - name: S
        url: https://example.com/rss
"#;
        let err = parse(yaml).resolve().unwrap_err();
        assert!(err.to_string().contains("defaults.threshold"));
    }

    #[test]
    fn test_threshold_out_of_range_is_fatal() {
        for bad in ["1.5", "0.0", "-0.2"] {
            let yaml = VALID.replace("threshold: 0.55", &format!("threshold: {}", bad));
            assert!(parse(&yaml).resolve().is_err(), "threshold {} accepted", bad);
        }
    }

    #[test]
    fn test_topic_threshold_override_validated() {
        let yaml = VALID.replace("threshold: 0.45", "threshold: 2.0");
        let err = parse(&yaml).resolve().unwrap_err();
        assert!(err.to_string().contains("topics.Wirtschaft.threshold"));
    }

    #[test]
    fn test_topic_without_sources_is_fatal() {
        let yaml = r#"
defaults:
  threshold: 0.5
  per_source_cap: 3
  total_cap: 40
  page_size: 8
  max_pages: 5
topics:
  empty:
    sources: []
"#;
        let err = parse(yaml).resolve().unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_invalid_url_is_fatal() {
        let yaml = VALID.replace("https://example.com/rss", "not a url");
        assert!(parse(&yaml).resolve().is_err());
        let yaml = VALID.replace("https://example.com/rss", "ftp://example.com/rss");
        assert!(parse(&yaml).resolve().is_err());
    }

    #[test]
    fn test_zero_cap_is_fatal() {
        let yaml = VALID.replace("per_source_cap: 3", "per_source_cap: 0");
        assert!(parse(&yaml).resolve().is_err());
    }

    #[test]
    fn test_total_below_per_source_is_fatal() {
        let yaml = VALID.replace("total_cap: 40", "total_cap: 2");
        assert!(parse(&yaml).resolve().is_err());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let yaml = VALID.replace("threshold: 0.55", "thresold: 0.55");
        assert!(serde_yaml::from_str::<FeedsConfig>(&yaml).is_err());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Tech News"), "tech-news");
        assert_eq!(slugify("U.S. & World"), "u-s-world");
        assert_eq!(slugify("economy"), "economy");
        assert_eq!(slugify("---"), "topic");
    }
}
