//! Story synthesis: one presentable record per cluster.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

use crate::item::Item;

pub const UNTITLED_STORY: &str = "Untitled story";

// Title length stops adding preference beyond this point.
const TITLE_SATURATION: usize = 120;
// Budget for title fragments when no member has a summary.
const TITLE_FALLBACK_BUDGET: usize = 160;

/// Per-article provenance kept inside a story.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoryArticle {
    pub source: String,
    pub title: String,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub paywall: Option<String>,
    pub image_url: Option<String>,
}

/// The presentable projection of one cluster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub title: String,
    pub summary: String,
    pub articles: Vec<StoryArticle>,
    pub article_count: usize,
    pub image_url: Option<String>,
}

/// Builds the story for one cluster. `members` is the cluster's items in
/// batch order, which every ordering rule below refers to.
pub fn synthesize(members: &[&Item], snippet_budget: usize, max_snippets: usize) -> Story {
    let articles: Vec<StoryArticle> = members
        .iter()
        .map(|item| StoryArticle {
            source: item.source.clone(),
            title: item.title.clone(),
            link: item.link.clone(),
            published: item.published,
            paywall: item.paywall.clone(),
            image_url: item.image_url.clone(),
        })
        .collect();

    Story {
        title: select_title(members),
        summary: compose_summary(members, snippet_budget, max_snippets),
        article_count: members.len(),
        image_url: members.iter().find_map(|item| item.image_url.clone()),
        articles,
    }
}

/// Picks the representative headline.
///
/// A single-member cluster keeps its own title. Larger clusters take the
/// most descriptive non-empty title: longest wins, except that length past
/// 120 graphemes stops counting, with raw length and then member order as
/// tie-breaks. Total even for all-empty titles.
fn select_title(members: &[&Item]) -> String {
    if members.len() == 1 {
        let only = &members[0].title;
        return if only.trim().is_empty() {
            UNTITLED_STORY.to_string()
        } else {
            only.clone()
        };
    }

    let mut best: Option<((usize, usize), &String)> = None;
    for item in members {
        if item.title.trim().is_empty() {
            continue;
        }
        let len = grapheme_len(&item.title);
        let key = (len.min(TITLE_SATURATION), len);
        if best.as_ref().map_or(true, |(best_key, _)| key > *best_key) {
            best = Some((key, &item.title));
        }
    }
    match best {
        Some((_, title)) => title.clone(),
        None => UNTITLED_STORY.to_string(),
    }
}

/// Composes the story summary from member snippets.
///
/// Walks members in order, skipping empty summaries and sources that already
/// contributed, truncating each snippet at the budget, and stopping at
/// `max_snippets`. When nothing has a summary, up to `max_snippets` titles
/// stand in. Fragments are joined with a single space.
fn compose_summary(members: &[&Item], snippet_budget: usize, max_snippets: usize) -> String {
    let mut fragments: Vec<String> = Vec::new();
    let mut contributed: HashSet<&str> = HashSet::new();
    for item in members {
        if fragments.len() >= max_snippets {
            break;
        }
        let snippet = item.summary.trim();
        if snippet.is_empty() {
            continue;
        }
        if !contributed.insert(item.source.as_str()) {
            continue;
        }
        fragments.push(truncate_graphemes(snippet, snippet_budget));
    }

    if fragments.is_empty() {
        fragments = members
            .iter()
            .filter(|item| !item.title.trim().is_empty())
            .take(max_snippets)
            .map(|item| truncate_graphemes(item.title.trim(), TITLE_FALLBACK_BUDGET))
            .collect();
    }

    fragments.join(" ")
}

/// Cuts at `budget` grapheme clusters, appending an ellipsis when anything
/// was dropped. No word-boundary search.
fn truncate_graphemes(text: &str, budget: usize) -> String {
    match text.grapheme_indices(true).nth(budget) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

fn grapheme_len(text: &str) -> usize {
    text.graphemes(true).count()
}
