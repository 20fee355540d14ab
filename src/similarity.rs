//! Pairwise embedding similarity
//!
//! Fidelity between two unit embeddings is the squared inner product,
//! which lands in [0,1] with 1.0 for identical vectors. `compare` wraps
//! the score with the class banding and the overlapping symbols between
//! the two raw bodies.

use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::OnceLock;

use crate::models::{Embedding, SimilarityClass, SimilarityResult};

/// Most overlapping symbols reported per comparison
const MAX_OVERLAP: usize = 10;

fn symbol_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:fn|def|func|function)\s+(\w+)|\b([a-z_][a-z0-9_]*)\s*=[^=]")
            .expect("symbol regex")
    })
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum()
}

/// Squared inner product of two unit vectors, clamped to [0,1].
///
/// Dimension mismatches compare the shared prefix, the same truncation
/// the reference overlap computation used.
pub fn fidelity(a: &Embedding, b: &Embedding) -> f64 {
    let d = dot(&a.vector, &b.vector);
    (d * d).clamp(0.0, 1.0)
}

/// Band a fidelity score into a similarity class.
pub fn classify(fidelity: f64) -> SimilarityClass {
    if fidelity > 0.95 {
        SimilarityClass::Exact
    } else if fidelity > 0.7 {
        SimilarityClass::Semantic
    } else {
        SimilarityClass::Pattern
    }
}

/// Full pairwise comparison: fidelity, class, overlapping symbols.
pub fn compare(a: &Embedding, b: &Embedding, body_a: &str, body_b: &str) -> SimilarityResult {
    let score = fidelity(a, b);
    SimilarityResult {
        hash_a: a.hash.clone(),
        hash_b: b.hash.clone(),
        fidelity: score,
        class: classify(score),
        overlapping_symbols: overlapping_symbols(body_a, body_b),
    }
}

/// Symbols (defined functions and assigned names) present in both bodies.
pub fn overlapping_symbols(body_a: &str, body_b: &str) -> Vec<String> {
    let a = extract_symbols(body_a);
    let b = extract_symbols(body_b);
    let mut shared: Vec<String> = a.intersection(&b).cloned().collect();
    shared.sort();
    shared.truncate(MAX_OVERLAP);
    shared
}

pub(crate) fn extract_symbols(body: &str) -> FxHashSet<String> {
    symbol_re()
        .captures_iter(body)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().to_string())
        .collect()
}
