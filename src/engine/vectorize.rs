//! TF-IDF vectorization and the all-pairs cosine similarity matrix.

use std::collections::{BTreeMap, HashMap, HashSet};

/// Builds the dense N×N similarity matrix for one topic batch.
///
/// Terms are unigrams plus adjacent bigrams of each canonical string, built
/// after stop-word removal. Terms present in strictly more than 90% of the
/// documents are excluded as batch boilerplate; a term seen in a single
/// document is kept. Vectors are L2-normalized TF-IDF, so each entry is the
/// cosine of a pair, clamped to [0, 1]. The diagonal is exactly 1.
pub fn similarity_matrix(docs: &[String], stop_words: &HashSet<String>) -> Vec<Vec<f32>> {
    let n = docs.len();

    let doc_counts: Vec<HashMap<String, f32>> = docs
        .iter()
        .map(|doc| {
            let mut counts: HashMap<String, f32> = HashMap::new();
            for term in terms(doc, stop_words) {
                *counts.entry(term).or_insert(0.0) += 1.0;
            }
            counts
        })
        .collect();

    let mut df: HashMap<&str, usize> = HashMap::new();
    for counts in &doc_counts {
        for term in counts.keys() {
            *df.entry(term.as_str()).or_insert(0) += 1;
        }
    }

    // Integer comparison keeps the 90% cut exact: drop iff df/n > 9/10.
    let idf: HashMap<&str, f32> = df
        .iter()
        .filter(|&(_, &d)| d * 10 <= n * 9)
        .map(|(&term, &d)| {
            let weight = ((1.0 + n as f32) / (1.0 + d as f32)).ln() + 1.0;
            (term, weight)
        })
        .collect();

    // Sorted maps keep float accumulation order-stable across runs.
    let vectors: Vec<BTreeMap<&str, f32>> = doc_counts
        .iter()
        .map(|counts| {
            let mut vector: BTreeMap<&str, f32> = BTreeMap::new();
            for (term, tf) in counts {
                if let Some(weight) = idf.get(term.as_str()) {
                    vector.insert(term.as_str(), tf * weight);
                }
            }
            let magnitude = vector.values().map(|w| w * w).sum::<f32>().sqrt();
            if magnitude > f32::EPSILON {
                for value in vector.values_mut() {
                    *value /= magnitude;
                }
            } else {
                vector.clear();
            }
            vector
        })
        .collect();

    let mut matrix = vec![vec![0.0_f32; n]; n];
    for (i, row) in matrix.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    for i in 0..n {
        for j in (i + 1)..n {
            let similarity = dot(&vectors[i], &vectors[j]).clamp(0.0, 1.0);
            matrix[i][j] = similarity;
            matrix[j][i] = similarity;
        }
    }
    matrix
}

fn dot(a: &BTreeMap<&str, f32>, b: &BTreeMap<&str, f32>) -> f32 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(term, weight)| large.get(term).map(|other| weight * other))
        .sum()
}

/// Maximal alphanumeric runs; digits count, case is already folded upstream.
fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect()
}

fn terms(text: &str, stop_words: &HashSet<String>) -> Vec<String> {
    let tokens: Vec<&str> = tokenize(text)
        .into_iter()
        .filter(|token| !stop_words.contains(*token))
        .collect();
    let mut terms: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    for pair in tokens.windows(2) {
        terms.push(format!("{} {}", pair[0], pair[1]));
    }
    terms
}
