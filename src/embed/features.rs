//! Classical scalar feature extraction
//!
//! Eight lexical features, each normalized to [0,1]. These are the sole
//! inputs to the embedding projection, so extraction must be fully
//! deterministic: same text, same features, always.

use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Normalization caps. Values beyond these saturate at 1.0.
const LINE_CAP: f32 = 500.0;
const TOKEN_CAP: f32 = 2000.0;
const NESTING_CAP: f32 = 10.0;
const DECISION_CAP: f32 = 20.0;
const ENTROPY_CAP: f32 = 8.0;

fn decision_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(if|elif|else|for|while|loop|match|switch|case|and|or|except|catch)\b")
            .expect("decision regex")
    })
}

fn loop_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(for|while|loop)\b").expect("loop regex"))
}

fn branch_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(if|elif|else|match|switch)\b").expect("branch regex"))
}

fn function_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(fn|def|func|function)\s+\w+").expect("function regex"))
}

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*\b").expect("identifier regex"))
}

/// The eight scalar features extracted from a code fragment.
///
/// Kept on the embedding for diagnostics, the way the health report keeps
/// its per-pillar breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    pub line_count: f32,
    pub branch_density: f32,
    pub nesting_depth: f32,
    pub identifier_diversity: f32,
    pub comment_ratio: f32,
    pub cyclomatic_complexity: f32,
    pub token_count: f32,
    pub entropy: f32,
}

impl FeatureVector {
    /// Extract all features from a text fragment.
    ///
    /// Empty or whitespace-only input yields the all-zero vector, which
    /// the projector maps to the canonical unit embedding.
    pub fn extract(text: &str) -> Self {
        if text.trim().is_empty() {
            return Self::default();
        }

        let lines: Vec<&str> = text.lines().collect();

        Self {
            line_count: (lines.len() as f32 / LINE_CAP).min(1.0),
            branch_density: Self::branch_density(text),
            nesting_depth: (Self::max_nesting_depth(text) as f32 / NESTING_CAP).min(1.0),
            identifier_diversity: Self::identifier_diversity(text),
            comment_ratio: Self::comment_ratio(&lines),
            cyclomatic_complexity: (decision_re().find_iter(text).count() as f32 / DECISION_CAP)
                .min(1.0),
            token_count: (text.split_whitespace().count() as f32 / TOKEN_CAP).min(1.0),
            entropy: (Self::shannon_entropy(text) / ENTROPY_CAP).min(1.0),
        }
    }

    /// Weighted mix of loops, branches and function definitions.
    fn branch_density(text: &str) -> f32 {
        let loops = loop_re().find_iter(text).count() as f32;
        let branches = branch_re().find_iter(text).count() as f32;
        let functions = function_re().find_iter(text).count() as f32;
        ((loops * 0.3 + branches * 0.2 + functions * 0.1) / 10.0).min(1.0)
    }

    /// Maximum bracket depth, with an indentation fallback for
    /// indentation-structured languages.
    pub(crate) fn max_nesting_depth(text: &str) -> usize {
        let mut max_depth = 0usize;
        let mut depth = 0usize;
        for ch in text.chars() {
            match ch {
                '{' | '[' | '(' => {
                    depth += 1;
                    max_depth = max_depth.max(depth);
                }
                '}' | ']' | ')' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }

        let indent_depth = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| {
                let spaces = l.len() - l.trim_start_matches(' ').len();
                spaces / 4
            })
            .max()
            .unwrap_or(0);

        max_depth.max(indent_depth)
    }

    /// Distinct identifiers over total identifier occurrences.
    fn identifier_diversity(text: &str) -> f32 {
        let mut total = 0usize;
        let mut distinct: FxHashSet<&str> = FxHashSet::default();
        for m in identifier_re().find_iter(text) {
            total += 1;
            distinct.insert(m.as_str());
        }
        if total == 0 {
            return 0.0;
        }
        distinct.len() as f32 / total as f32
    }

    fn comment_ratio(lines: &[&str]) -> f32 {
        let comment_lines = lines
            .iter()
            .filter(|l| {
                let t = l.trim_start();
                t.starts_with('#') || t.starts_with("//") || t.starts_with("/*")
            })
            .count();
        comment_lines as f32 / lines.len().max(1) as f32
    }

    /// Shannon entropy over character frequencies, in bits.
    fn shannon_entropy(text: &str) -> f32 {
        let mut counts: FxHashMap<char, usize> = FxHashMap::default();
        let mut total = 0usize;
        for ch in text.chars() {
            *counts.entry(ch).or_insert(0) += 1;
            total += 1;
        }
        if total == 0 {
            return 0.0;
        }
        let total = total as f32;
        counts
            .values()
            .map(|&c| {
                let p = c as f32 / total;
                -p * p.log2()
            })
            .sum()
    }

    /// True for the canonical zero-feature vector.
    pub fn is_zero(&self) -> bool {
        self.as_array().iter().all(|f| *f == 0.0)
    }

    /// The features in fixed declaration order.
    pub fn as_array(&self) -> [f32; 8] {
        [
            self.line_count,
            self.branch_density,
            self.nesting_depth,
            self.identifier_diversity,
            self.comment_ratio,
            self.cyclomatic_complexity,
            self.token_count,
            self.entropy,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_zero() {
        assert!(FeatureVector::extract("").is_zero());
        assert!(FeatureVector::extract("   \n\t  ").is_zero());
    }

    #[test]
    fn test_extraction_deterministic() {
        let code = "fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n";
        let a = FeatureVector::extract(code);
        let b = FeatureVector::extract(code);
        assert_eq!(a, b);
    }

    #[test]
    fn test_features_in_unit_range() {
        let code = "fn main() {\n    for i in 0..10 {\n        if i > 5 {\n            println!(\"{}\", i);\n        }\n    }\n}\n";
        let f = FeatureVector::extract(code);
        for v in f.as_array() {
            assert!((0.0..=1.0).contains(&v), "feature out of range: {v}");
        }
    }

    #[test]
    fn test_nesting_depth_counts_braces() {
        let code = "{ { { } } }";
        assert_eq!(FeatureVector::max_nesting_depth(code), 3);
    }

    #[test]
    fn test_nesting_depth_counts_indentation() {
        let code = "def f():\n    if a:\n        if b:\n            return 1\n";
        assert!(FeatureVector::max_nesting_depth(code) >= 3);
    }

    #[test]
    fn test_different_code_different_features() {
        let a = FeatureVector::extract("x = 1");
        let b = FeatureVector::extract("fn f() { if x { loop {} } }");
        assert_ne!(a, b);
    }
}
