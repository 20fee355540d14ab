//! Integration cost evaluation
//!
//! Cost combines three sub-costs: testing burden, risk exposure and
//! change magnitude. The headline weighting (0.35 / 0.25 / 0.40) is then
//! refined by a short perturb-and-accept search over a small weight
//! adjustment vector: the evaluator keeps proposing nudged weightings and
//! accepts any that lower the estimate, bounded by the iteration budget.
//! Seeded runs are bit-deterministic; unseeded runs derive their seed
//! from the candidate content, so repeated calls still agree.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::models::{CodeContext, PatchCandidate, PatchType};

/// Headline sub-cost weights
const TESTING_WEIGHT: f64 = 0.35;
const RISK_WEIGHT: f64 = 0.25;
const MAGNITUDE_WEIGHT: f64 = 0.40;

/// Bound on each weight adjustment component
const ADJUST_BOUND: f64 = 0.5;
/// Size of one perturbation step
const PERTURB_STEP: f64 = 0.1;
/// Relative improvement below which the search counts as settled
const CONVERGENCE_TOL: f64 = 0.01;

/// One cost evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct CostOutcome {
    /// Estimated integration cost, >= 0
    pub cost: f64,
    pub breakdown: CostBreakdown,
    /// False when the final budgeted iteration was still improving
    pub converged: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CostBreakdown {
    pub testing_burden: f64,
    pub risk_exposure: f64,
    pub change_magnitude: f64,
}

/// Baseline testing burden by patch type.
fn testing_baseline(patch_type: PatchType) -> f64 {
    match patch_type {
        PatchType::BugFix => 0.95,
        PatchType::Security => 0.99,
        PatchType::Performance => 0.7,
        PatchType::Maintainability => 0.5,
        PatchType::Refactoring => 0.8,
    }
}

pub struct CostEvaluator {
    iterations: usize,
    seed: Option<u64>,
}

impl CostEvaluator {
    pub fn new(iterations: usize, seed: Option<u64>) -> Self {
        Self { iterations, seed }
    }

    /// Estimate the integration cost of one candidate.
    pub fn evaluate(&self, candidate: &PatchCandidate, context: &CodeContext) -> CostOutcome {
        let breakdown = CostBreakdown {
            testing_burden: Self::testing_burden(candidate),
            risk_exposure: Self::risk_exposure(candidate),
            change_magnitude: Self::change_magnitude(candidate, context),
        };

        let mut rng = ChaCha8Rng::seed_from_u64(self.candidate_seed(candidate));

        // Variational refinement over a 3-component weight adjustment
        let mut adjust = [0.0f64; 3];
        let mut best = objective(&breakdown, &adjust);
        let mut improved_last_iteration = false;

        for _ in 0..self.iterations.max(1) {
            let mut trial = adjust;
            for component in &mut trial {
                let step = (rng.random::<f64>() * 2.0 - 1.0) * PERTURB_STEP;
                *component = (*component + step).clamp(-ADJUST_BOUND, ADJUST_BOUND);
            }

            let value = objective(&breakdown, &trial);
            if value < best {
                improved_last_iteration = (best - value) / best.max(f64::EPSILON) > CONVERGENCE_TOL;
                best = value;
                adjust = trial;
            } else {
                improved_last_iteration = false;
            }
        }

        CostOutcome {
            cost: best.max(0.0),
            breakdown,
            // Budget exhausted while still finding >1% improvements means
            // the estimate is best-effort, not settled.
            converged: !improved_last_iteration,
        }
    }

    /// Seed precedence: configured seed XOR candidate content, so one
    /// seeded engine still evaluates distinct candidates differently.
    fn candidate_seed(&self, candidate: &PatchCandidate) -> u64 {
        let content = candidate
            .body
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325u64, |acc, b| {
                (acc ^ b as u64).wrapping_mul(0x100_0000_01b3)
            });
        match self.seed {
            Some(seed) => seed ^ content,
            None => content,
        }
    }

    fn testing_burden(candidate: &PatchCandidate) -> f64 {
        let base = testing_baseline(candidate.patch_type);
        (base * (1.0 + candidate.affected_symbols.len() as f64 * 0.1)).min(1.0)
    }

    fn risk_exposure(candidate: &PatchCandidate) -> f64 {
        (candidate.risk_score + candidate.complexity_score * 0.3).min(1.0)
    }

    fn change_magnitude(candidate: &PatchCandidate, context: &CodeContext) -> f64 {
        let changed = candidate.body.lines().count() as f64;
        let baseline = context.source.lines().count().max(1) as f64;
        (changed / baseline).min(1.0)
    }
}

/// The weighted estimate under a normalized weight adjustment.
///
/// Adjustments reshape the weighting multiplicatively and are
/// renormalized so the three weights always sum to one.
fn objective(breakdown: &CostBreakdown, adjust: &[f64; 3]) -> f64 {
    let weights = [
        TESTING_WEIGHT * adjust[0].exp(),
        RISK_WEIGHT * adjust[1].exp(),
        MAGNITUDE_WEIGHT * adjust[2].exp(),
    ];
    let total: f64 = weights.iter().sum();

    (breakdown.testing_burden * weights[0]
        + breakdown.risk_exposure * weights[1]
        + breakdown.change_magnitude * weights[2])
        / total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatchType;

    fn candidate() -> PatchCandidate {
        PatchCandidate::new("p1", "fn patched() { safer(); }", PatchType::BugFix)
            .with_risk(0.4)
            .with_complexity(0.2)
            .with_symbols(vec!["patched".to_string()])
    }

    fn context() -> CodeContext {
        CodeContext::new("fn patched() { unsafe_call(); }\nfn other() {}\n", "src/lib.rs")
    }

    #[test]
    fn test_seeded_evaluation_deterministic() {
        let evaluator = CostEvaluator::new(5, Some(42));
        let a = evaluator.evaluate(&candidate(), &context());
        let b = evaluator.evaluate(&candidate(), &context());
        assert_eq!(a.cost, b.cost);
    }

    #[test]
    fn test_unseeded_evaluation_repeatable() {
        let evaluator = CostEvaluator::new(5, None);
        let a = evaluator.evaluate(&candidate(), &context());
        let b = evaluator.evaluate(&candidate(), &context());
        // Unseeded runs derive the seed from content, so they agree far
        // inside the 5% tolerance.
        assert!((a.cost - b.cost).abs() <= a.cost * 0.05);
    }

    #[test]
    fn test_cost_non_negative() {
        let outcome = CostEvaluator::new(5, Some(7)).evaluate(&candidate(), &context());
        assert!(outcome.cost >= 0.0);
    }

    #[test]
    fn test_refinement_never_exceeds_headline_estimate() {
        let evaluator = CostEvaluator::new(5, Some(13));
        let outcome = evaluator.evaluate(&candidate(), &context());
        let headline = objective(&outcome.breakdown, &[0.0; 3]);
        assert!(outcome.cost <= headline + 1e-12);
    }

    #[test]
    fn test_security_patch_costs_more_testing_than_maintenance() {
        let security = PatchCandidate::new("s", "fn f() {}", PatchType::Security);
        let maintenance = PatchCandidate::new("m", "fn f() {}", PatchType::Maintainability);
        let ctx = context();
        let evaluator = CostEvaluator::new(5, Some(1));
        let cost_s = evaluator.evaluate(&security, &ctx);
        let cost_m = evaluator.evaluate(&maintenance, &ctx);
        assert!(cost_s.breakdown.testing_burden > cost_m.breakdown.testing_burden);
    }
}
