//! Complex Logic Detector
//!
//! Flags bodies whose decision-point density is out of proportion to
//! their size.

use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

use crate::models::{deterministic_smell_id, CodeContext, CodeSmell, PatchCandidate, SmellKind};
use crate::smells::SmellDetector;

fn decision_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:if|elif|else|for|while|match|switch|and|or)\b|&&|\|\|")
            .expect("decision regex")
    })
}

/// Decision points per line above which a body counts as complex
const DENSITY_THRESHOLD: f64 = 0.3;
/// Bodies with fewer decision points than this are never flagged;
/// density is meaningless on a couple of branches
const MIN_DECISIONS: usize = 3;

pub struct ComplexLogicDetector;

impl ComplexLogicDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ComplexLogicDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SmellDetector for ComplexLogicDetector {
    fn name(&self) -> &'static str {
        "complex-logic"
    }

    fn description(&self) -> &'static str {
        "Detects high branching density"
    }

    fn detect(&self, candidate: &PatchCandidate, _context: &CodeContext) -> Result<Vec<CodeSmell>> {
        let decisions = decision_re().find_iter(&candidate.body).count();
        let lines = candidate.body.lines().count().max(1);

        if decisions < MIN_DECISIONS || (decisions as f64) <= lines as f64 * DENSITY_THRESHOLD {
            return Ok(vec![]);
        }

        let title = format!("High decision density: {decisions} in {lines} lines");
        Ok(vec![CodeSmell {
            id: deterministic_smell_id(self.name(), &candidate.id, 1, &title),
            kind: SmellKind::ComplexLogic,
            detector: self.name().to_string(),
            severity: (decisions as f64 / (lines as f64 * 0.5)).min(1.0),
            confidence: 0.65,
            line_start: 1,
            line_end: lines as u32,
            description: title,
            suggested_fix: Some(
                "Flatten branches with early returns or a lookup table.".to_string(),
            ),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatchType;

    #[test]
    fn test_flags_dense_branching() {
        let body = "if a && b { x } else if c || d { y } else { z }\nif e { while f { if g { h } } }\n";
        let candidate = PatchCandidate::new("p1", body, PatchType::BugFix);
        let smells = ComplexLogicDetector::new()
            .detect(&candidate, &CodeContext::new("", "lib.rs"))
            .unwrap();
        assert_eq!(smells.len(), 1);
        assert_eq!(smells[0].kind, SmellKind::ComplexLogic);
        assert!(smells[0].severity > 0.5);
    }

    #[test]
    fn test_straight_line_code_clean() {
        let body = "let a = 1;\nlet b = 2;\nlet c = a + b;\nstore(c);\n";
        let candidate = PatchCandidate::new("p1", body, PatchType::BugFix);
        let smells = ComplexLogicDetector::new()
            .detect(&candidate, &CodeContext::new("", "lib.rs"))
            .unwrap();
        assert!(smells.is_empty());
    }
}
