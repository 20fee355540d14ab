//! Poor Naming Detector
//!
//! Flags fresh code that leans on opaque single-character bindings
//! outside the conventional loop counters.

use anyhow::Result;
use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::OnceLock;

use crate::models::{deterministic_smell_id, CodeContext, CodeSmell, PatchCandidate, SmellKind};
use crate::smells::SmellDetector;

fn single_char_binding_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:let\s+(?:mut\s+)?|var\s+)?([a-z])\s*=[^=]").expect("binding regex")
    })
}

/// Counters nobody reads as opaque
const LOOP_IDIOMS: [&str; 3] = ["i", "j", "k"];

pub struct PoorNamingDetector {
    threshold: usize,
}

impl PoorNamingDetector {
    pub fn new() -> Self {
        Self { threshold: 2 }
    }
}

impl Default for PoorNamingDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SmellDetector for PoorNamingDetector {
    fn name(&self) -> &'static str {
        "poor-naming"
    }

    fn description(&self) -> &'static str {
        "Detects opaque single-character bindings"
    }

    fn detect(&self, candidate: &PatchCandidate, _context: &CodeContext) -> Result<Vec<CodeSmell>> {
        let mut opaque: FxHashSet<&str> = FxHashSet::default();
        let mut first_line = 0u32;

        for (i, line) in candidate.body.lines().enumerate() {
            for caps in single_char_binding_re().captures_iter(line) {
                let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                if LOOP_IDIOMS.contains(&name) {
                    continue;
                }
                if opaque.insert(name) && first_line == 0 {
                    first_line = i as u32 + 1;
                }
            }
        }

        if opaque.len() < self.threshold {
            return Ok(vec![]);
        }

        let mut names: Vec<&str> = opaque.iter().copied().collect();
        names.sort_unstable();
        let title = format!("Opaque names: {}", names.join(", "));
        Ok(vec![CodeSmell {
            id: deterministic_smell_id(self.name(), &candidate.id, first_line, &title),
            kind: SmellKind::PoorNaming,
            detector: self.name().to_string(),
            severity: (0.3 + 0.1 * opaque.len() as f64).min(1.0),
            confidence: 0.5,
            line_start: first_line,
            line_end: first_line,
            description: format!(
                "{} single-character bindings ({}) obscure intent",
                opaque.len(),
                names.join(", ")
            ),
            suggested_fix: Some("Rename bindings after what they hold.".to_string()),
        }])
    }
}
