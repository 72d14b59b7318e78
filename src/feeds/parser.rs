//! Feed parsing: RSS and Atom bodies into raw entries.

use anyhow::{anyhow, Result};
use feed_rs::parser;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::io::Cursor;
use tracing::debug;

use super::types::RawEntry;
use crate::TARGET_WEB_REQUEST;

lazy_static! {
    static ref TAG_RE: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref NUMERIC_ENTITY_RE: Regex = Regex::new(r"&#([xX]?[0-9a-fA-F]+);").unwrap();
}

/// Parse a feed body into raw entries, retrying once after XML cleanup.
pub fn parse_entries(body: &str, url: &str) -> Result<Vec<RawEntry>> {
    let reader = Cursor::new(body);
    match parser::parse(reader) {
        Ok(feed) => Ok(feed.entries.into_iter().map(map_entry).collect()),
        Err(first_err) => {
            let cleaned = cleanup_xml(body);
            if cleaned.contains("<rss") || cleaned.contains("<feed") {
                let reader = Cursor::new(&cleaned);
                match parser::parse(reader) {
                    Ok(feed) => {
                        debug!(target: TARGET_WEB_REQUEST, "Feed {} parsed after XML cleanup", url);
                        Ok(feed.entries.into_iter().map(map_entry).collect())
                    }
                    Err(second_err) => Err(anyhow!(
                        "failed to parse feed from {} even after cleanup: {}; {}",
                        url,
                        first_err,
                        second_err
                    )),
                }
            } else {
                let preview = if body
                    .chars()
                    .all(|c| c.is_ascii_graphic() || c.is_whitespace())
                {
                    body.chars().take(100).collect::<String>()
                } else {
                    "[binary data]".to_string()
                };
                Err(anyhow!(
                    "content from {} is not RSS or Atom: {}",
                    url,
                    preview
                ))
            }
        }
    }
}

fn map_entry(entry: feed_rs::model::Entry) -> RawEntry {
    let image_url = first_image(&entry);
    let title = entry.title.map(|text| text.content).unwrap_or_default();
    let link = entry.links.first().map(|link| link.href.clone());
    let summary = entry
        .summary
        .map(|text| text.content)
        .or_else(|| entry.content.and_then(|content| content.body))
        .unwrap_or_default();
    let published = entry.published.or(entry.updated);

    RawEntry {
        title: strip_markup(&title),
        link,
        summary: strip_markup(&summary),
        published,
        image_url,
    }
}

/// First usable image attached to an entry: media thumbnails win over
/// inline media content.
fn first_image(entry: &feed_rs::model::Entry) -> Option<String> {
    for media in &entry.media {
        if let Some(thumbnail) = media.thumbnails.first() {
            return Some(thumbnail.image.uri.clone());
        }
        if let Some(url) = media
            .content
            .iter()
            .find_map(|content| content.url.as_ref())
        {
            return Some(url.to_string());
        }
    }
    None
}

/// Strip HTML tags and decode the entities that show up in feed text.
/// Single-pass entity decoding, `&amp;` last, so double-escaped text
/// stays escaped once.
pub fn strip_markup(text: &str) -> String {
    let stripped = TAG_RE.replace_all(text, " ");
    let decoded = NUMERIC_ENTITY_RE.replace_all(&stripped, |caps: &Captures| {
        decode_numeric_entity(&caps[1]).unwrap_or_default()
    });
    let decoded = decoded
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_numeric_entity(body: &str) -> Option<String> {
    let value = if let Some(hex) = body.strip_prefix('x').or_else(|| body.strip_prefix('X')) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        body.parse::<u32>().ok()?
    };
    char::from_u32(value).map(|c| c.to_string())
}

/// Repair the malformed XML that real-world feeds ship.
pub fn cleanup_xml(xml: &str) -> String {
    let mut cleaned = xml.trim().trim_start_matches('\u{FEFF}').to_string();

    // Drop anything before the document start.
    for marker in ["<?xml", "<rss", "<feed"] {
        if let Some(start) = cleaned.find(marker) {
            cleaned = cleaned[start..].to_string();
            break;
        }
    }

    // Entities XML parsers reject, mapped to numeric references.
    cleaned = cleaned
        .replace("&nbsp;", "&#160;")
        .replace("&ndash;", "&#8211;")
        .replace("&mdash;", "&#8212;")
        .replace("&rsquo;", "&#8217;")
        .replace("&lsquo;", "&#8216;")
        .replace("&rdquo;", "&#8221;")
        .replace("&ldquo;", "&#8220;")
        .replace("&amp;amp;", "&amp;")
        .replace("&apos;", "&#39;");

    cleaned.retain(|c| {
        matches!(c,
            '\u{0009}' | '\u{000A}' | '\u{000D}'
            | '\u{0020}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}')
    });

    if !cleaned.starts_with("<?xml") {
        cleaned = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", cleaned);
    }

    cleaned
}
