//! Candidate generation
//!
//! The engine normally receives candidates from the caller. When it does
//! not, the orchestrator asks a `CandidateSource` for them. The default
//! source derives one candidate per diff hunk with keyword-based type
//! classification; anything smarter (an IDE's fixer, an LLM, a lint
//! engine) plugs in behind the same trait.

use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::models::{CodeContext, PatchCandidate, PatchType};
use crate::similarity::extract_symbols;

/// Pluggable producer of candidate patches for a context.
pub trait CandidateSource: Send + Sync {
    fn generate(&self, context: &CodeContext) -> Result<Vec<PatchCandidate>>;
}

/// Classify a change description / hunk body into a patch type with its
/// default heuristic risk.
pub fn classify_change(text: &str) -> (PatchType, f64) {
    let lower = text.to_lowercase();
    if lower.contains("bug") || lower.contains("error") || lower.contains("fix") {
        (PatchType::BugFix, 0.4)
    } else if lower.contains("performance") || lower.contains("speed") || lower.contains("perf") {
        (PatchType::Performance, 0.3)
    } else if lower.contains("security") || lower.contains("vuln") {
        (PatchType::Security, 0.5)
    } else {
        (PatchType::Refactoring, 0.2)
    }
}

/// Default source: one candidate per diff hunk.
pub struct HunkCandidateSource;

impl HunkCandidateSource {
    pub fn new() -> Self {
        Self
    }

    /// Content-derived candidate id, stable across runs.
    fn candidate_id(context: &CodeContext, index: usize, body: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(context.file_path.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        hasher.update(index.to_le_bytes());
        hasher.update([0u8]);
        hasher.update(body.as_bytes());
        let digest = hasher.finalize();
        format!("patch-{:x}", digest)[..18].to_string()
    }
}

impl Default for HunkCandidateSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CandidateSource for HunkCandidateSource {
    fn generate(&self, context: &CodeContext) -> Result<Vec<PatchCandidate>> {
        let context_lines = context.source.lines().count().max(1) as f64;
        let mut candidates = Vec::with_capacity(context.hunks.len());

        for (index, hunk) in context.hunks.iter().enumerate() {
            if hunk.body.trim().is_empty() {
                continue;
            }

            let (patch_type, risk) = classify_change(&hunk.body);
            let mut symbols: Vec<String> = extract_symbols(&hunk.body).into_iter().collect();
            symbols.sort();
            symbols.truncate(8);

            let complexity = (hunk.line_count as f64 / context_lines).min(1.0);
            candidates.push(
                PatchCandidate::new(
                    Self::candidate_id(context, index, &hunk.body),
                    hunk.body.clone(),
                    patch_type,
                )
                .with_description(format!(
                    "{patch_type} change at line {} of {}",
                    hunk.start_line,
                    context.file_path.display()
                ))
                .with_risk(risk)
                .with_complexity(complexity)
                .with_symbols(symbols),
            );
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DiffHunk;

    fn context_with_hunks() -> CodeContext {
        CodeContext::new("fn a() {}\nfn b() {}\n", "src/lib.rs").with_hunks(vec![
            DiffHunk::new(1, "fn a() { fixed_bug(); }"),
            DiffHunk::new(2, "fn b() { faster_path(); } // performance"),
        ])
    }

    #[test]
    fn test_one_candidate_per_hunk() {
        let candidates = HunkCandidateSource::new().generate(&context_with_hunks()).unwrap();
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_ids_deterministic_and_unique() {
        let source = HunkCandidateSource::new();
        let context = context_with_hunks();
        let a = source.generate(&context).unwrap();
        let b = source.generate(&context).unwrap();
        assert_eq!(a[0].id, b[0].id);
        assert_ne!(a[0].id, a[1].id);
    }

    #[test]
    fn test_classification_keywords() {
        assert_eq!(classify_change("fix null pointer bug").0, PatchType::BugFix);
        assert_eq!(classify_change("improve performance of loop").0, PatchType::Performance);
        assert_eq!(classify_change("patch security vuln").0, PatchType::Security);
        assert_eq!(classify_change("tidy module layout").0, PatchType::Refactoring);
    }

    #[test]
    fn test_empty_hunks_skipped() {
        let context =
            CodeContext::new("src", "lib.rs").with_hunks(vec![DiffHunk::new(1, "   \n")]);
        let candidates = HunkCandidateSource::new().generate(&context).unwrap();
        assert!(candidates.is_empty());
    }
}
