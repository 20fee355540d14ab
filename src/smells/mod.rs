//! Code smell detection
//!
//! Nine structural detectors behind one trait, run per candidate body.
//! Severity is a structural measurement made by the detector; confidence
//! is assigned afterwards from heuristic agreement: a smell only one
//! detector saw is capped at 0.7, and every additional detector flagging
//! the same region raises it toward 1.0.

mod complex_logic;
mod dead_code;
mod deep_nesting;
mod duplicate_code;
mod large_class;
mod long_method;
mod missing_tests;
mod poor_naming;
mod tight_coupling;

pub use complex_logic::ComplexLogicDetector;
pub use dead_code::DeadCodeDetector;
pub use deep_nesting::DeepNestingDetector;
pub use duplicate_code::DuplicateCodeDetector;
pub use large_class::LargeClassDetector;
pub use long_method::LongMethodDetector;
pub use missing_tests::MissingTestsDetector;
pub use poor_naming::PoorNamingDetector;
pub use tight_coupling::TightCouplingDetector;

use anyhow::Result;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

use crate::models::{CodeContext, CodeSmell, PatchCandidate};

/// Confidence ceiling for a smell only one detector agrees on
pub const SINGLE_DETECTOR_CAP: f64 = 0.7;
/// Confidence added per additional agreeing detector
const AGREEMENT_BOOST: f64 = 0.1;
/// Line bucket width used to decide that two detections overlap
const LOCATION_BUCKET: u32 = 10;

/// Trait for all smell detectors.
///
/// Detectors scan one candidate body (with the surrounding context
/// available) and report structural findings. A failing detector is
/// isolated by the engine and contributes nothing.
pub trait SmellDetector: Send + Sync {
    /// Unique identifier, e.g. "long-method"
    fn name(&self) -> &'static str;

    /// Human-readable description of what this detector finds
    fn description(&self) -> &'static str;

    /// Scan a candidate and return detected smells.
    ///
    /// Detectors set severity from structure and may set a raw confidence
    /// up to [`SINGLE_DETECTOR_CAP`]; the engine finalizes confidence from
    /// cross-detector agreement.
    fn detect(&self, candidate: &PatchCandidate, context: &CodeContext) -> Result<Vec<CodeSmell>>;
}

/// The full detector set in deterministic registration order.
pub fn default_detectors() -> Vec<Box<dyn SmellDetector>> {
    vec![
        Box::new(DuplicateCodeDetector::new()),
        Box::new(LongMethodDetector::new()),
        Box::new(DeadCodeDetector::new()),
        Box::new(DeepNestingDetector::new()),
        Box::new(LargeClassDetector::new()),
        Box::new(ComplexLogicDetector::new()),
        Box::new(PoorNamingDetector::new()),
        Box::new(TightCouplingDetector::new()),
        Box::new(MissingTestsDetector::new()),
    ]
}

/// Runs every registered detector over a candidate and finalizes
/// agreement-based confidence.
pub struct SmellEngine {
    detectors: Vec<Box<dyn SmellDetector>>,
}

impl SmellEngine {
    pub fn new() -> Self {
        Self { detectors: default_detectors() }
    }

    pub fn with_detectors(detectors: Vec<Box<dyn SmellDetector>>) -> Self {
        Self { detectors }
    }

    pub fn detector_count(&self) -> usize {
        self.detectors.len()
    }

    /// Run all detectors over one candidate.
    ///
    /// A detector failure is logged and skipped; it never fails the
    /// candidate, let alone the batch.
    pub fn detect(&self, candidate: &PatchCandidate, context: &CodeContext) -> Vec<CodeSmell> {
        let mut smells = Vec::new();

        for detector in &self.detectors {
            match detector.detect(candidate, context) {
                Ok(found) => smells.extend(found),
                Err(e) => {
                    warn!("detector {} failed on {}: {e}", detector.name(), candidate.id);
                }
            }
        }

        finalize_confidence(&mut smells);
        smells.sort_by(|a, b| {
            b.severity
                .partial_cmp(&a.severity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        smells
    }
}

impl Default for SmellEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Raise confidence where independent detectors flagged the same region.
///
/// Detections are grouped into coarse line buckets; the number of distinct
/// detectors in a bucket is the agreement count for every smell in it.
fn finalize_confidence(smells: &mut [CodeSmell]) {
    let mut detectors_by_bucket: FxHashMap<u32, FxHashSet<&str>> = FxHashMap::default();
    for smell in smells.iter() {
        detectors_by_bucket
            .entry(smell.line_start / LOCATION_BUCKET)
            .or_default()
            .insert(smell.detector.as_str());
    }

    let agreement: FxHashMap<u32, usize> = detectors_by_bucket
        .into_iter()
        .map(|(bucket, detectors)| (bucket, detectors.len()))
        .collect();

    for smell in smells.iter_mut() {
        let agreeing = agreement
            .get(&(smell.line_start / LOCATION_BUCKET))
            .copied()
            .unwrap_or(1);
        let raw = smell.confidence.min(SINGLE_DETECTOR_CAP);
        smell.confidence = (raw + AGREEMENT_BOOST * (agreeing.saturating_sub(1)) as f64).min(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{deterministic_smell_id, PatchType, SmellKind};

    fn smell(detector: &str, line: u32, confidence: f64) -> CodeSmell {
        CodeSmell {
            id: deterministic_smell_id(detector, "p1", line, "t"),
            kind: SmellKind::ComplexLogic,
            detector: detector.to_string(),
            severity: 0.5,
            confidence,
            line_start: line,
            line_end: line,
            description: String::new(),
            suggested_fix: None,
        }
    }

    #[test]
    fn test_single_detector_capped() {
        let mut smells = vec![smell("complex-logic", 3, 0.9)];
        finalize_confidence(&mut smells);
        assert!(smells[0].confidence <= SINGLE_DETECTOR_CAP + 1e-9);
    }

    #[test]
    fn test_agreement_boosts_confidence() {
        let mut smells = vec![
            smell("complex-logic", 3, 0.7),
            smell("deep-nesting", 5, 0.7),
        ];
        finalize_confidence(&mut smells);
        // Both land in bucket 0, so two detectors agree
        assert!((smells[0].confidence - 0.8).abs() < 1e-9);
        assert!((smells[1].confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_distant_detections_do_not_agree() {
        let mut smells = vec![
            smell("complex-logic", 3, 0.7),
            smell("deep-nesting", 95, 0.7),
        ];
        finalize_confidence(&mut smells);
        assert!((smells[0].confidence - 0.7).abs() < 1e-9);
        assert!((smells[1].confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_engine_isolates_failing_detector() {
        struct Broken;
        impl SmellDetector for Broken {
            fn name(&self) -> &'static str {
                "broken"
            }
            fn description(&self) -> &'static str {
                "always fails"
            }
            fn detect(
                &self,
                _candidate: &PatchCandidate,
                _context: &CodeContext,
            ) -> Result<Vec<CodeSmell>> {
                anyhow::bail!("boom")
            }
        }

        let engine = SmellEngine::with_detectors(vec![
            Box::new(Broken),
            Box::new(DeepNestingDetector::new()),
        ]);
        let candidate = PatchCandidate::new(
            "p1",
            "{ { { { { { deep } } } } } }",
            PatchType::Refactoring,
        );
        let context = CodeContext::new("", "lib.rs");
        let smells = engine.detect(&candidate, &context);
        assert!(smells.iter().all(|s| s.detector != "broken"));
        assert!(!smells.is_empty());
    }
}
