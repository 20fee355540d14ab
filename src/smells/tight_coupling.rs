//! Tight Coupling Detector
//!
//! Flags a single change body reaching into many distinct modules or
//! receivers.

use anyhow::Result;
use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::OnceLock;

use crate::models::{deterministic_smell_id, CodeContext, CodeSmell, PatchCandidate, SmellKind};
use crate::smells::SmellDetector;

fn receiver_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)(?:::|\.)\w+").expect("receiver regex")
    })
}

pub struct TightCouplingDetector {
    threshold: usize,
}

impl TightCouplingDetector {
    pub fn new() -> Self {
        Self { threshold: 5 }
    }
}

impl Default for TightCouplingDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SmellDetector for TightCouplingDetector {
    fn name(&self) -> &'static str {
        "tight-coupling"
    }

    fn description(&self) -> &'static str {
        "Detects one change reaching into many distinct modules"
    }

    fn detect(&self, candidate: &PatchCandidate, _context: &CodeContext) -> Result<Vec<CodeSmell>> {
        let receivers: FxHashSet<&str> = receiver_re()
            .captures_iter(&candidate.body)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|r| !matches!(*r, "self" | "Self" | "super" | "crate"))
            .collect();

        if receivers.len() <= self.threshold {
            return Ok(vec![]);
        }

        let mut names: Vec<&str> = receivers.iter().copied().collect();
        names.sort_unstable();
        let title = format!("Touches {} distinct modules", receivers.len());
        Ok(vec![CodeSmell {
            id: deterministic_smell_id(self.name(), &candidate.id, 1, &title),
            kind: SmellKind::TightCoupling,
            detector: self.name().to_string(),
            severity: (receivers.len() as f64 / 12.0).min(1.0),
            confidence: 0.55,
            line_start: 1,
            line_end: candidate.body.lines().count() as u32,
            description: format!(
                "Change reaches into {} distinct receivers ({}...)",
                receivers.len(),
                names.iter().take(4).copied().collect::<Vec<_>>().join(", ")
            ),
            suggested_fix: Some(
                "Route the change through one owning module instead of many.".to_string(),
            ),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatchType;

    #[test]
    fn test_flags_many_receivers() {
        let body = "db::open();\nnet.connect();\nfs::read();\nui.render();\nauth::check();\ncache.flush();\nlog::emit();\n";
        let candidate = PatchCandidate::new("p1", body, PatchType::Refactoring);
        let smells = TightCouplingDetector::new()
            .detect(&candidate, &CodeContext::new("", "lib.rs"))
            .unwrap();
        assert_eq!(smells.len(), 1);
        assert_eq!(smells[0].kind, SmellKind::TightCoupling);
    }

    #[test]
    fn test_focused_change_clean() {
        let body = "cache.get(key);\ncache.put(key, value);\n";
        let candidate = PatchCandidate::new("p1", body, PatchType::Refactoring);
        let smells = TightCouplingDetector::new()
            .detect(&candidate, &CodeContext::new("", "lib.rs"))
            .unwrap();
        assert!(smells.is_empty());
    }

    #[test]
    fn test_self_receivers_ignored() {
        let body = "self.a();\nself.b();\nself.c();\nself.d();\nself.e();\nself.f();\n";
        let candidate = PatchCandidate::new("p1", body, PatchType::Refactoring);
        let smells = TightCouplingDetector::new()
            .detect(&candidate, &CodeContext::new("", "lib.rs"))
            .unwrap();
        assert!(smells.is_empty());
    }
}
