//! Duplicate Code Detector

use anyhow::Result;
use rustc_hash::FxHashMap;

use crate::models::{deterministic_smell_id, CodeContext, CodeSmell, PatchCandidate, SmellKind};
use crate::smells::SmellDetector;

/// Lines shorter than this (trimmed) are too generic to count as clones
const MIN_SIGNIFICANT_LEN: usize = 20;

pub struct DuplicateCodeDetector {
    max_findings: usize,
}

impl DuplicateCodeDetector {
    pub fn new() -> Self {
        Self { max_findings: 20 }
    }
}

impl Default for DuplicateCodeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SmellDetector for DuplicateCodeDetector {
    fn name(&self) -> &'static str {
        "duplicate-code"
    }

    fn description(&self) -> &'static str {
        "Detects repeated significant lines within a patch body"
    }

    fn detect(&self, candidate: &PatchCandidate, _context: &CodeContext) -> Result<Vec<CodeSmell>> {
        let mut findings = Vec::new();
        let mut first_seen: FxHashMap<&str, u32> = FxHashMap::default();

        for (i, line) in candidate.body.lines().enumerate() {
            if findings.len() >= self.max_findings {
                break;
            }
            let trimmed = line.trim();
            if trimmed.len() <= MIN_SIGNIFICANT_LEN {
                continue;
            }

            let line_no = i as u32 + 1;
            match first_seen.get(trimmed) {
                Some(&prev) => {
                    let title = format!("Duplicate code at lines {prev} and {line_no}");
                    findings.push(CodeSmell {
                        id: deterministic_smell_id(self.name(), &candidate.id, line_no, &title),
                        kind: SmellKind::DuplicateCode,
                        detector: self.name().to_string(),
                        severity: 0.7,
                        confidence: 0.65,
                        line_start: prev,
                        line_end: line_no,
                        description: title,
                        suggested_fix: Some(
                            "Extract the repeated logic into a shared helper.".to_string(),
                        ),
                    });
                }
                None => {
                    first_seen.insert(trimmed, line_no);
                }
            }
        }

        Ok(findings)
    }
}
