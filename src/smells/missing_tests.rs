//! Missing Tests Detector
//!
//! Flags candidates that change executable code without touching any
//! test: no test markers in the body and no test file in the context's
//! diff hunks.

use anyhow::Result;

use crate::models::{deterministic_smell_id, CodeContext, CodeSmell, PatchCandidate, SmellKind};
use crate::smells::SmellDetector;

const TEST_MARKERS: [&str; 5] = ["#[test]", "def test_", "fn test_", "it(", "assert"];

pub struct MissingTestsDetector;

impl MissingTestsDetector {
    pub fn new() -> Self {
        Self
    }

    fn touches_code(candidate: &PatchCandidate) -> bool {
        !candidate.affected_symbols.is_empty()
            || candidate.body.contains("fn ")
            || candidate.body.contains("def ")
            || candidate.body.contains("function ")
    }

    fn has_test_changes(candidate: &PatchCandidate, context: &CodeContext) -> bool {
        if TEST_MARKERS.iter().any(|m| candidate.body.contains(m)) {
            return true;
        }
        let path = context.file_path.to_string_lossy();
        path.contains("test") || path.contains("spec")
    }
}

impl Default for MissingTestsDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SmellDetector for MissingTestsDetector {
    fn name(&self) -> &'static str {
        "missing-tests"
    }

    fn description(&self) -> &'static str {
        "Detects changed code paths with no accompanying test changes"
    }

    fn detect(&self, candidate: &PatchCandidate, context: &CodeContext) -> Result<Vec<CodeSmell>> {
        if !Self::touches_code(candidate) || Self::has_test_changes(candidate, context) {
            return Ok(vec![]);
        }

        let title = "Changed code paths lack test coverage".to_string();
        Ok(vec![CodeSmell {
            id: deterministic_smell_id(self.name(), &candidate.id, 1, &title),
            kind: SmellKind::MissingTests,
            detector: self.name().to_string(),
            severity: 0.5,
            confidence: 0.5,
            line_start: 1,
            line_end: candidate.body.lines().count().max(1) as u32,
            description: format!(
                "Candidate touches {} symbol(s) but adds or changes no tests",
                candidate.affected_symbols.len()
            ),
            suggested_fix: Some("Cover the changed paths with a test before merging.".to_string()),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatchType;

    #[test]
    fn test_untested_change_flagged() {
        let candidate = PatchCandidate::new("p1", "fn handler() { dispatch(); }", PatchType::BugFix)
            .with_symbols(vec!["handler".to_string()]);
        let context = CodeContext::new("fn handler() {}", "src/server.rs");
        let smells = MissingTestsDetector::new().detect(&candidate, &context).unwrap();
        assert_eq!(smells.len(), 1);
        assert_eq!(smells[0].kind, SmellKind::MissingTests);
    }

    #[test]
    fn test_body_with_test_marker_clean() {
        let candidate = PatchCandidate::new(
            "p1",
            "fn handler() {}\n#[test]\nfn test_handler() { assert!(true); }",
            PatchType::BugFix,
        );
        let context = CodeContext::new("", "src/server.rs");
        let smells = MissingTestsDetector::new().detect(&candidate, &context).unwrap();
        assert!(smells.is_empty());
    }

    #[test]
    fn test_non_code_change_clean() {
        let candidate = PatchCandidate::new("p1", "Updated the README wording.", PatchType::Maintainability);
        let context = CodeContext::new("", "README.md");
        let smells = MissingTestsDetector::new().detect(&candidate, &context).unwrap();
        assert!(smells.is_empty());
    }
}
