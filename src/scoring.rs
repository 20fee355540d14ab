//! Score aggregation
//!
//! Combines the ranker's success probabilities with the cost evaluator's
//! estimates into one ordinal ranking:
//!
//! ```text
//! combined = probability_weight * probability - cost_weight * normalized_cost
//! ```
//!
//! Costs are min-max normalized across the candidate set (all-equal costs
//! normalize to 0 for everyone). The list is sorted descending by
//! combined score; equal scores order by ascending candidate id, the
//! documented tie-breaking convention. Rationale strings come from fixed
//! threshold bands, never free-form generation.

use crate::models::RankingScore;

/// Per-candidate input to aggregation.
#[derive(Debug, Clone)]
pub struct AggregateInput {
    pub id: String,
    pub probability: f64,
    pub cost: f64,
    /// Count of affected symbols, used only for the rationale text
    pub symbol_count: usize,
    /// True when ranking or cost evaluation returned a best-effort result
    pub degraded: bool,
}

pub struct RankingAggregator {
    probability_weight: f64,
    cost_weight: f64,
}

impl RankingAggregator {
    pub fn new(probability_weight: f64, cost_weight: f64) -> Self {
        Self { probability_weight, cost_weight }
    }

    /// Produce the final ranking, best candidate first.
    pub fn aggregate(&self, inputs: &[AggregateInput]) -> Vec<(String, RankingScore)> {
        let normalized = normalize_costs(inputs);

        let mut scored: Vec<(String, RankingScore)> = inputs
            .iter()
            .zip(normalized)
            .map(|(input, norm_cost)| {
                let combined =
                    self.probability_weight * input.probability - self.cost_weight * norm_cost;
                let score = RankingScore {
                    success_probability: input.probability,
                    integration_cost: input.cost,
                    combined_score: combined,
                    rank: 0,
                    rationale: rationale(input.probability, norm_cost, input.symbol_count, input.degraded),
                    degraded: input.degraded,
                };
                (input.id.clone(), score)
            })
            .collect();

        scored.sort_by(|(id_a, a), (id_b, b)| {
            b.combined_score
                .partial_cmp(&a.combined_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| id_a.cmp(id_b))
        });

        for (rank, (_, score)) in scored.iter_mut().enumerate() {
            score.rank = rank + 1;
        }

        scored
    }
}

/// Min-max scale costs into [0,1]; a flat cost profile scales to all 0.
fn normalize_costs(inputs: &[AggregateInput]) -> Vec<f64> {
    let min = inputs.iter().map(|i| i.cost).fold(f64::INFINITY, f64::min);
    let max = inputs.iter().map(|i| i.cost).fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    inputs
        .iter()
        .map(|i| if span > 0.0 { (i.cost - min) / span } else { 0.0 })
        .collect()
}

/// Threshold-banded rationale, e.g.
/// "high success probability, moderate integration cost; touches 3 symbols".
fn rationale(probability: f64, norm_cost: f64, symbol_count: usize, degraded: bool) -> String {
    let prob_band = if probability > 0.7 {
        "high"
    } else if probability > 0.4 {
        "moderate"
    } else {
        "low"
    };
    let cost_band = if norm_cost < 0.33 {
        "low"
    } else if norm_cost < 0.66 {
        "moderate"
    } else {
        "high"
    };

    let mut text = format!(
        "{prob_band} success probability, {cost_band} integration cost; touches {symbol_count} symbol(s)"
    );
    if degraded {
        text.push_str("; best-effort estimate (optimization budget exhausted)");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(id: &str, probability: f64, cost: f64) -> AggregateInput {
        AggregateInput { id: id.to_string(), probability, cost, symbol_count: 1, degraded: false }
    }

    #[test]
    fn test_known_combination() {
        // Three candidates with probabilities 0.9/0.5/0.2 and costs
        // 1.0/2.0/3.0: the first normalizes to cost 0 and must win with
        // combined score 0.6 * 0.9 - 0.4 * 0 = 0.54.
        let inputs = vec![
            input("c1", 0.9, 1.0),
            input("c2", 0.5, 2.0),
            input("c3", 0.2, 3.0),
        ];
        let scored = RankingAggregator::new(0.6, 0.4).aggregate(&inputs);

        assert_eq!(scored[0].0, "c1");
        assert!((scored[0].1.combined_score - 0.54).abs() < 1e-9);
        assert_eq!(scored[0].1.rank, 1);
        assert_eq!(scored[2].1.rank, 3);
    }

    #[test]
    fn test_sorted_descending() {
        let inputs = vec![
            input("a", 0.2, 3.0),
            input("b", 0.9, 1.0),
            input("c", 0.5, 2.0),
        ];
        let scored = RankingAggregator::new(0.6, 0.4).aggregate(&inputs);
        for pair in scored.windows(2) {
            assert!(pair[0].1.combined_score >= pair[1].1.combined_score);
        }
    }

    #[test]
    fn test_equal_costs_normalize_to_zero() {
        let inputs = vec![input("a", 0.5, 2.0), input("b", 0.8, 2.0)];
        let scored = RankingAggregator::new(0.6, 0.4).aggregate(&inputs);
        // With all costs equal only probability matters
        assert_eq!(scored[0].0, "b");
        assert!((scored[0].1.combined_score - 0.48).abs() < 1e-9);
        assert!((scored[1].1.combined_score - 0.30).abs() < 1e-9);
    }

    #[test]
    fn test_ties_break_by_id() {
        let inputs = vec![input("zeta", 0.5, 1.0), input("alpha", 0.5, 1.0)];
        let scored = RankingAggregator::new(0.6, 0.4).aggregate(&inputs);
        assert_eq!(scored[0].0, "alpha");
        assert_eq!(scored[1].0, "zeta");
    }

    #[test]
    fn test_rationale_bands() {
        let text = rationale(0.9, 0.1, 2, false);
        assert!(text.contains("high success probability"));
        assert!(text.contains("low integration cost"));

        let degraded = rationale(0.3, 0.9, 0, true);
        assert!(degraded.contains("low success probability"));
        assert!(degraded.contains("high integration cost"));
        assert!(degraded.contains("best-effort"));
    }
}
