//! Markdown rendering of digest pages and the index.
//!
//! Pure string building; the CLI decides where files land.

use chrono::{DateTime, Utc};

use crate::config::TopicSettings;
use crate::engine::paginate::Page;
use crate::engine::story::{Story, StoryArticle};

/// A rendered file: name relative to the output directory plus content.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFile {
    pub name: String,
    pub content: String,
}

/// Per-topic counts for the index page.
#[derive(Debug, Clone)]
pub struct TopicSummary {
    pub name: String,
    pub slug: String,
    pub stories: usize,
    pub pages: usize,
}

/// Render all pages of one topic. A topic with no stories still gets its
/// canonical page, so stale output from a previous run is overwritten.
pub fn render_pages(
    topic: &TopicSettings,
    pages: &[Page],
    generated_at: DateTime<Utc>,
) -> Vec<RenderedFile> {
    if pages.is_empty() {
        return vec![RenderedFile {
            name: format!("{}.md", topic.slug),
            content: render_empty(topic, generated_at),
        }];
    }

    pages
        .iter()
        .map(|page| RenderedFile {
            name: format!("{}.md", page.slug),
            content: render_page(topic, page, generated_at),
        })
        .collect()
}

pub fn render_index(summaries: &[TopicSummary], generated_at: DateTime<Utc>) -> String {
    let mut md = String::new();
    md.push_str("# Herald digest\n\n");
    md.push_str(&format!("_Generated {}_\n\n", stamp(generated_at)));
    for summary in summaries {
        md.push_str(&format!(
            "- [{}]({}.md) — {} stories · {} pages\n",
            summary.name, summary.slug, summary.stories, summary.pages
        ));
    }
    md
}

fn render_page(topic: &TopicSettings, page: &Page, generated_at: DateTime<Utc>) -> String {
    let mut md = String::new();
    md.push_str(&format!("# {}\n\n", topic.name));
    md.push_str(&format!(
        "_Page {} of {} · generated {}_\n\n",
        page.number,
        page.total_pages,
        stamp(generated_at)
    ));

    for story in &page.stories {
        md.push_str(&render_story(story));
    }

    let mut nav = Vec::new();
    if let Some(prev) = &page.prev {
        nav.push(format!("[← Previous]({}.md)", prev));
    }
    if let Some(next) = &page.next {
        nav.push(format!("[Next →]({}.md)", next));
    }
    if !nav.is_empty() {
        md.push_str("---\n\n");
        md.push_str(&format!("{}\n", nav.join(" · ")));
    }
    md
}

fn render_empty(topic: &TopicSettings, generated_at: DateTime<Utc>) -> String {
    format!(
        "# {}\n\n_Generated {}_\n\n_No stories yet._\n",
        topic.name,
        stamp(generated_at)
    )
}

fn render_story(story: &Story) -> String {
    let mut md = String::new();
    md.push_str(&format!("## {}\n\n", story.title));
    if let Some(image) = &story.image_url {
        md.push_str(&format!("![]({})\n\n", image));
    }
    if !story.summary.is_empty() {
        md.push_str(&format!("{}\n\n", story.summary));
    }
    for article in &story.articles {
        md.push_str(&format!("- {}\n", article_line(article)));
    }
    md.push('\n');
    md
}

fn article_line(article: &StoryArticle) -> String {
    let mut line = match &article.link {
        Some(link) => format!("**{}** — [{}]({})", article.source, article.title, link),
        None => format!("**{}** — {}", article.source, article.title),
    };
    if let Some(published) = &article.published {
        line.push_str(&format!(" · _{}_", published.format("%Y-%m-%d %H:%M")));
    }
    if let Some(kind) = &article.paywall {
        line.push_str(&format!(" · paywall: `{}`", kind));
    }
    line
}

fn stamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}
