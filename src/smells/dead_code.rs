//! Dead Code Detector
//!
//! Flags commented-out code: comment lines whose payload still looks like
//! a statement or declaration.

use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

use crate::models::{deterministic_smell_id, CodeContext, CodeSmell, PatchCandidate, SmellKind};
use crate::smells::SmellDetector;

fn commented_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?://|#)\s*(?:fn|def|func|if|for|while|return|let|var|class|struct|impl|import|use)\b")
            .expect("commented code regex")
    })
}

pub struct DeadCodeDetector {
    max_findings: usize,
}

impl DeadCodeDetector {
    pub fn new() -> Self {
        Self { max_findings: 20 }
    }
}

impl Default for DeadCodeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SmellDetector for DeadCodeDetector {
    fn name(&self) -> &'static str {
        "dead-code"
    }

    fn description(&self) -> &'static str {
        "Detects commented-out code left in a patch body"
    }

    fn detect(&self, candidate: &PatchCandidate, _context: &CodeContext) -> Result<Vec<CodeSmell>> {
        let mut findings = Vec::new();

        for (i, line) in candidate.body.lines().enumerate() {
            if findings.len() >= self.max_findings {
                break;
            }
            if !commented_code_re().is_match(line) {
                continue;
            }

            let line_no = i as u32 + 1;
            let title = format!("Commented-out code at line {line_no}");
            findings.push(CodeSmell {
                id: deterministic_smell_id(self.name(), &candidate.id, line_no, &title),
                kind: SmellKind::DeadCode,
                detector: self.name().to_string(),
                severity: 0.6,
                confidence: 0.6,
                line_start: line_no,
                line_end: line_no,
                description: title,
                suggested_fix: Some(
                    "Delete the commented-out code; version control keeps the history.".to_string(),
                ),
            });
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatchType;

    #[test]
    fn test_flags_commented_statement() {
        let body = "let a = 1;\n// let old_value = compute();\n# return cached\n";
        let candidate = PatchCandidate::new("p1", body, PatchType::Refactoring);
        let smells = DeadCodeDetector::new()
            .detect(&candidate, &CodeContext::new("", "lib.rs"))
            .unwrap();
        assert_eq!(smells.len(), 2);
        assert!(smells.iter().all(|s| s.kind == SmellKind::DeadCode));
    }

    #[test]
    fn test_prose_comments_clean() {
        let body = "// Updates the cache before returning.\nlet a = refresh();\n";
        let candidate = PatchCandidate::new("p1", body, PatchType::Refactoring);
        let smells = DeadCodeDetector::new()
            .detect(&candidate, &CodeContext::new("", "lib.rs"))
            .unwrap();
        assert!(smells.is_empty());
    }
}
