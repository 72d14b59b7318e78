//! Candidate-pool ordering, per-source caps, and story ranking.

use std::cmp::Reverse;
use std::collections::HashMap;

use super::story::Story;
use crate::item::Item;

/// Stable newest-first order. `published` is source-supplied and missing
/// often enough that `fetched_at` stands in when it is absent.
pub fn sort_newest_first(items: &mut [Item]) {
    items.sort_by_key(|item| Reverse(item.published.unwrap_or(item.fetched_at)));
}

/// Caps source contributions in a single left-to-right pass over an already
/// newest-first list: an item is kept while its source is under
/// `per_source`, and the pass stops the moment `total` items are kept. One
/// prolific outlet therefore cannot crowd the batch.
pub fn balance_sources(items: Vec<Item>, per_source: usize, total: usize) -> Vec<Item> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<Item> = Vec::new();
    for item in items {
        if kept.len() >= total {
            break;
        }
        let taken = counts.entry(item.source.clone()).or_insert(0);
        if *taken < per_source {
            *taken += 1;
            kept.push(item);
        }
    }
    kept
}

/// Multi-article stories first (corroboration is a relevance signal),
/// singles after; relative order inside each group is preserved.
pub fn rank_stories(stories: &mut [Story]) {
    stories.sort_by_key(|story| story.article_count <= 1);
}
