//! Fixed-size pagination of ranked stories.

use serde::{Deserialize, Serialize};

use super::story::Story;

/// One digest page. `prev`/`next` hold page slugs; the presenter decides
/// what a slug becomes on disk or in a URL.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub number: usize,
    pub total_pages: usize,
    pub slug: String,
    pub prev: Option<String>,
    pub next: Option<String>,
    pub stories: Vec<Story>,
}

/// Slices stories into pages of `page_size` (the last may be short), capped
/// at `max_pages`; stories past the cap are dropped, never queued. Stories
/// are atomic: a page boundary never splits one.
///
/// Page 1 owns the topic's canonical un-suffixed slug, page n is
/// `{slug}-{n}`, and `prev`/`next` walk that chain, so page 2 points back
/// at the canonical page.
pub fn paginate(
    topic_slug: &str,
    stories: Vec<Story>,
    page_size: usize,
    max_pages: usize,
) -> Vec<Page> {
    if page_size == 0 || max_pages == 0 {
        return Vec::new();
    }

    let mut chunks: Vec<Vec<Story>> = Vec::new();
    let mut remaining = stories.into_iter();
    while chunks.len() < max_pages {
        let chunk: Vec<Story> = remaining.by_ref().take(page_size).collect();
        if chunk.is_empty() {
            break;
        }
        chunks.push(chunk);
    }

    let total_pages = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(idx, stories)| {
            let number = idx + 1;
            Page {
                number,
                total_pages,
                slug: page_slug(topic_slug, number),
                prev: (number > 1).then(|| page_slug(topic_slug, number - 1)),
                next: (number < total_pages).then(|| page_slug(topic_slug, number + 1)),
                stories,
            }
        })
        .collect()
}

/// Page 1 is the topic slug itself, later pages carry a `-{n}` suffix.
pub fn page_slug(topic_slug: &str, number: usize) -> String {
    if number <= 1 {
        topic_slug.to_string()
    } else {
        format!("{}-{}", topic_slug, number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stories(n: usize) -> Vec<Story> {
        (0..n)
            .map(|i| Story {
                title: format!("story {}", i),
                summary: String::new(),
                articles: Vec::new(),
                article_count: 1,
                image_url: None,
            })
            .collect()
    }

    #[test]
    fn test_five_stories_in_pages_of_two() {
        let pages = paginate("economy", stories(5), 2, 3);
        assert_eq!(pages.len(), 3);
        let sizes: Vec<usize> = pages.iter().map(|p| p.stories.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);

        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[0].slug, "economy");
        assert_eq!(pages[0].prev, None);
        assert_eq!(pages[0].next, Some("economy-2".to_string()));

        assert_eq!(pages[1].slug, "economy-2");
        assert_eq!(pages[1].prev, Some("economy".to_string()));
        assert_eq!(pages[1].next, Some("economy-3".to_string()));

        assert_eq!(pages[2].slug, "economy-3");
        assert_eq!(pages[2].prev, Some("economy-2".to_string()));
        assert_eq!(pages[2].next, None);

        assert!(pages.iter().all(|p| p.total_pages == 3));
    }

    #[test]
    fn test_max_pages_drops_extra_stories() {
        let pages = paginate("t", stories(10), 2, 3);
        assert_eq!(pages.len(), 3);
        let kept: usize = pages.iter().map(|p| p.stories.len()).sum();
        assert_eq!(kept, 6);
        assert_eq!(pages[2].next, None);
        assert_eq!(pages[2].total_pages, 3);
    }

    #[test]
    fn test_single_short_page() {
        let pages = paginate("t", stories(1), 8, 5);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[0].total_pages, 1);
        assert_eq!(pages[0].prev, None);
        assert_eq!(pages[0].next, None);
    }

    #[test]
    fn test_no_stories_no_pages() {
        assert!(paginate("t", Vec::new(), 8, 5).is_empty());
    }

    #[test]
    fn test_story_order_is_preserved_across_pages() {
        let pages = paginate("t", stories(4), 3, 5);
        assert_eq!(pages[0].stories[0].title, "story 0");
        assert_eq!(pages[0].stories[2].title, "story 2");
        assert_eq!(pages[1].stories[0].title, "story 3");
    }
}
