//! Large Class Detector

use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

use crate::models::{deterministic_smell_id, CodeContext, CodeSmell, PatchCandidate, SmellKind};
use crate::smells::SmellDetector;

fn type_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:class|struct|impl|trait|interface)\s+(\w+)")
            .expect("type start regex")
    })
}

pub struct LargeClassDetector {
    threshold: u32,
}

impl LargeClassDetector {
    pub fn new() -> Self {
        Self { threshold: 200 }
    }
}

impl Default for LargeClassDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SmellDetector for LargeClassDetector {
    fn name(&self) -> &'static str {
        "large-class"
    }

    fn description(&self) -> &'static str {
        "Detects oversized class/impl bodies"
    }

    fn detect(&self, candidate: &PatchCandidate, _context: &CodeContext) -> Result<Vec<CodeSmell>> {
        let mut findings = Vec::new();
        let lines: Vec<&str> = candidate.body.lines().collect();

        let mut starts: Vec<(u32, String)> = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            if let Some(caps) = type_start_re().captures(line) {
                starts.push((i as u32 + 1, caps[1].to_string()));
            }
        }

        for (idx, (start, name)) in starts.iter().enumerate() {
            let end = starts
                .get(idx + 1)
                .map(|(next, _)| next - 1)
                .unwrap_or(lines.len() as u32);
            let length = end.saturating_sub(*start);
            if length <= self.threshold {
                continue;
            }

            let title = format!("Large class: {name} ({length} lines)");
            findings.push(CodeSmell {
                id: deterministic_smell_id(self.name(), &candidate.id, *start, &title),
                kind: SmellKind::LargeClass,
                detector: self.name().to_string(),
                severity: (length as f64 / 400.0).min(1.0),
                confidence: 0.6,
                line_start: *start,
                line_end: end,
                description: format!(
                    "Type '{name}' spans {length} lines (threshold: {})",
                    self.threshold
                ),
                suggested_fix: Some(
                    "Split responsibilities into smaller cohesive types.".to_string(),
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
    fn test_flags_oversized_type() {
        let mut body = String::from("struct Everything {\n");
        for i in 0..250 {
            body.push_str(&format!("    field_{i}: u32,\n"));
        }
        body.push_str("}\n");
        let candidate = PatchCandidate::new("p1", body, PatchType::Refactoring);
        let smells = LargeClassDetector::new()
            .detect(&candidate, &CodeContext::new("", "lib.rs"))
            .unwrap();
        assert_eq!(smells.len(), 1);
        assert_eq!(smells[0].kind, SmellKind::LargeClass);
        assert!(smells[0].severity > 0.5);
    }

    #[test]
    fn test_small_type_clean() {
        let candidate =
            PatchCandidate::new("p1", "struct Point { x: f32, y: f32 }\n", PatchType::Refactoring);
        let smells = LargeClassDetector::new()
            .detect(&candidate, &CodeContext::new("", "lib.rs"))
            .unwrap();
        assert!(smells.is_empty());
    }
}
