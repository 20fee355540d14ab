//! Long Method Detector

use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

use crate::models::{deterministic_smell_id, CodeContext, CodeSmell, PatchCandidate, SmellKind};
use crate::smells::SmellDetector;

fn function_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:fn|def|func|function)\s+(\w+)")
            .expect("function start regex")
    })
}

pub struct LongMethodDetector {
    threshold: u32,
}

impl LongMethodDetector {
    pub fn new() -> Self {
        Self { threshold: 50 }
    }

    pub fn with_threshold(threshold: u32) -> Self {
        Self { threshold }
    }
}

impl Default for LongMethodDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SmellDetector for LongMethodDetector {
    fn name(&self) -> &'static str {
        "long-method"
    }

    fn description(&self) -> &'static str {
        "Detects functions longer than 50 lines"
    }

    fn detect(&self, candidate: &PatchCandidate, _context: &CodeContext) -> Result<Vec<CodeSmell>> {
        let mut findings = Vec::new();
        let lines: Vec<&str> = candidate.body.lines().collect();

        // Function spans run from one definition line to the next (or EOF).
        let mut starts: Vec<(u32, String)> = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            if let Some(caps) = function_start_re().captures(line) {
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

            let title = format!("Long method: {name} ({length} lines)");
            findings.push(CodeSmell {
                id: deterministic_smell_id(self.name(), &candidate.id, *start, &title),
                kind: SmellKind::LongMethod,
                detector: self.name().to_string(),
                severity: (length as f64 / 100.0).min(1.0),
                confidence: 0.7,
                line_start: *start,
                line_end: end,
                description: format!(
                    "Function '{name}' spans {length} lines (threshold: {})",
                    self.threshold
                ),
                suggested_fix: Some("Break into smaller, focused functions.".to_string()),
            });
        }

        Ok(findings)
    }
}
