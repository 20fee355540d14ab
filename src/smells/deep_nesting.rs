//! Deep Nesting Detector

use anyhow::Result;

use crate::embed::FeatureVector;
use crate::models::{deterministic_smell_id, CodeContext, CodeSmell, PatchCandidate, SmellKind};
use crate::smells::SmellDetector;

pub struct DeepNestingDetector {
    threshold: usize,
}

impl DeepNestingDetector {
    pub fn new() -> Self {
        Self { threshold: 4 }
    }

    /// Deepest bracket nesting in the body and the line where it occurs.
    fn deepest_point(body: &str) -> (usize, u32) {
        let mut max_depth = 0usize;
        let mut max_line = 1u32;
        let mut depth = 0usize;

        for (i, line) in body.lines().enumerate() {
            for ch in line.chars() {
                match ch {
                    '{' | '[' | '(' => {
                        depth += 1;
                        if depth > max_depth {
                            max_depth = depth;
                            max_line = i as u32 + 1;
                        }
                    }
                    '}' | ']' | ')' => depth = depth.saturating_sub(1),
                    _ => {}
                }
            }
        }

        (max_depth, max_line)
    }
}

impl Default for DeepNestingDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SmellDetector for DeepNestingDetector {
    fn name(&self) -> &'static str {
        "deep-nesting"
    }

    fn description(&self) -> &'static str {
        "Detects nesting depth beyond 4 levels"
    }

    fn detect(&self, candidate: &PatchCandidate, _context: &CodeContext) -> Result<Vec<CodeSmell>> {
        let (bracket_depth, line) = Self::deepest_point(&candidate.body);
        // Indentation-based depth covers indentation-structured languages
        let depth = bracket_depth.max(FeatureVector::max_nesting_depth(&candidate.body));

        if depth <= self.threshold {
            return Ok(vec![]);
        }

        let title = format!("Excessive nesting: {depth} levels");
        Ok(vec![CodeSmell {
            id: deterministic_smell_id(self.name(), &candidate.id, line, &title),
            kind: SmellKind::DeepNesting,
            detector: self.name().to_string(),
            severity: (depth as f64 / 8.0).min(1.0),
            confidence: 0.7,
            line_start: line,
            line_end: line,
            description: format!(
                "Body reaches {depth} levels of nesting (threshold: {})",
                self.threshold
            ),
            suggested_fix: Some(
                "Extract nested logic into functions or use early returns.".to_string(),
            ),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatchType;

    #[test]
    fn test_flags_deep_nesting() {
        let body = "fn f() {\n    if a {\n        if b {\n            if c {\n                if d {\n                    work();\n                }\n            }\n        }\n    }\n}\n";
        let candidate = PatchCandidate::new("p1", body, PatchType::BugFix);
        let smells = DeepNestingDetector::new()
            .detect(&candidate, &CodeContext::new("", "lib.rs"))
            .unwrap();
        assert_eq!(smells.len(), 1);
        assert_eq!(smells[0].kind, SmellKind::DeepNesting);
        assert!(smells[0].severity > 0.5);
    }

    #[test]
    fn test_shallow_body_clean() {
        let candidate =
            PatchCandidate::new("p1", "fn f() { if a { work(); } }", PatchType::BugFix);
        let smells = DeepNestingDetector::new()
            .detect(&candidate, &CodeContext::new("", "lib.rs"))
            .unwrap();
        assert!(smells.is_empty());
    }
}
