//! The per-topic digest engine: balance, normalize, vectorize, cluster,
//! synthesize, rank. Pure batch transforms with no I/O; topics can be
//! processed independently.

pub mod balance;
pub mod cluster;
pub mod normalize;
pub mod paginate;
pub mod story;
pub mod union_find;
pub mod vectorize;

use tracing::debug;

use crate::config::TopicSettings;
use crate::item::Item;
use crate::TARGET_ENGINE;

use self::story::Story;

/// Turns one topic's candidate pool into a ranked story list.
///
/// The pool is sorted newest-first and source-balanced before anything
/// quadratic runs, so the similarity matrix never exceeds `total_cap` rows.
/// Batches of size 0 or 1, and batches whose canonical text is entirely
/// empty, short-circuit without touching the vectorizer. Deterministic for
/// a fixed input.
pub fn build_stories(mut items: Vec<Item>, settings: &TopicSettings) -> Vec<Story> {
    balance::sort_newest_first(&mut items);
    let items = balance::balance_sources(items, settings.per_source_cap, settings.total_cap);
    if items.is_empty() {
        return Vec::new();
    }

    let canonicals: Vec<String> = items
        .iter()
        .map(|item| normalize::canonical_text(&item.title, &item.summary, settings.language))
        .collect();

    let clusters = if items.len() == 1 {
        vec![vec![0]]
    } else if canonicals.iter().all(|c| !c.contains(char::is_alphanumeric)) {
        // No comparable text anywhere in the batch: everything stays single.
        (0..items.len()).map(|i| vec![i]).collect()
    } else {
        let matrix = vectorize::similarity_matrix(&canonicals, &settings.stop_words);
        cluster::cluster_indices(&matrix, settings.threshold)
    };

    debug!(
        target: TARGET_ENGINE,
        "topic '{}': {} items in {} clusters at threshold {}",
        settings.name,
        items.len(),
        clusters.len(),
        settings.threshold
    );

    let mut stories: Vec<Story> = clusters
        .iter()
        .map(|members| {
            let cluster_items: Vec<&Item> = members.iter().map(|&i| &items[i]).collect();
            story::synthesize(&cluster_items, settings.snippet_budget, settings.max_snippets)
        })
        .collect();
    balance::rank_stories(&mut stories);
    stories
}
