//! Canonical comparison text for similarity scoring.

use lazy_static::lazy_static;
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalization profile, selected per topic. Unlisted languages get the
/// generic fold only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Language {
    English,
    German,
    Other,
}

impl Language {
    pub fn from_code(code: &str) -> Self {
        match code.to_ascii_lowercase().as_str() {
            "en" | "eng" => Language::English,
            "de" | "deu" | "ger" => Language::German,
            _ => Language::Other,
        }
    }
}

lazy_static! {
    static ref ENGLISH_STOP_WORDS: HashSet<&'static str> = [
        "a", "about", "after", "all", "also", "an", "and", "are", "as", "at", "be", "been",
        "but", "by", "for", "from", "had", "has", "have", "he", "her", "his", "i", "if", "in",
        "into", "is", "it", "its", "not", "of", "on", "or", "out", "over", "said", "she",
        "that", "the", "their", "they", "this", "to", "up", "was", "were", "will", "with",
    ]
    .iter()
    .copied()
    .collect();

    // Stored pre-folded so entries match normalized tokens.
    static ref GERMAN_STOP_WORDS: HashSet<&'static str> = [
        "aber", "als", "am", "an", "auch", "auf", "aus", "bei", "bis", "das", "dass", "dem",
        "den", "der", "des", "die", "durch", "ein", "eine", "einem", "einen", "einer", "er",
        "es", "fuer", "gegen", "hat", "im", "in", "ist", "mit", "nach", "nicht", "noch",
        "sein", "sich", "sie", "sind", "ueber", "um", "und", "unter", "vom", "von", "vor",
        "war", "werden", "wird", "zu", "zum", "zur",
    ]
    .iter()
    .copied()
    .collect();

    static ref NO_STOP_WORDS: HashSet<&'static str> = HashSet::new();
}

/// Built-in stop-word list for a language; per-topic extras are merged in
/// by config resolution.
pub fn default_stop_words(lang: Language) -> &'static HashSet<&'static str> {
    match lang {
        Language::English => &ENGLISH_STOP_WORDS,
        Language::German => &GERMAN_STOP_WORDS,
        Language::Other => &NO_STOP_WORDS,
    }
}

/// The canonical comparison string for one item: normalized title and
/// summary joined by ". ".
pub fn canonical_text(title: &str, summary: &str, lang: Language) -> String {
    format!(
        "{}. {}",
        normalize_text(title, lang),
        normalize_text(summary, lang)
    )
}

/// Lowercases, folds locale letter variants to ASCII-safe equivalents,
/// replaces punctuation with spaces, and collapses whitespace. Pure.
pub fn normalize_text(text: &str, lang: Language) -> String {
    let lowered = text.to_lowercase();
    let folded = match lang {
        Language::German => fold_german(&lowered),
        _ => lowered,
    };
    // Combining marks are dropped, not spaced, so accents fold away
    // instead of splitting the word.
    folded
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// Two-letter expansions must run before NFKD splits the umlauts into
// base letter plus combining mark.
fn fold_german(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'ä' => out.push_str("ae"),
            'ö' => out.push_str("oe"),
            'ü' => out.push_str("ue"),
            'ß' => out.push_str("ss"),
            _ => out.push(c),
        }
    }
    out
}
