//! Probabilistic patch ranking
//!
//! Candidates become nodes of a compatibility graph whose edge weights
//! measure how much two patches interfere (shared symbols, near-identical
//! embeddings). A round-bounded max-cut local search partitions the graph
//! so that interfering candidates land on opposite sides; each node's
//! success probability combines its overall conflict mass with how much
//! of that conflict the partition resolved. The search tunes a mixing
//! angle alongside the partition, mirroring variational parameter tuning,
//! and always returns its best estimate when the round budget runs out.
//!
//! Past `fallback_threshold` candidates the quadratic search is skipped
//! for a documented greedy degree heuristic.

use indexmap::IndexMap;
use petgraph::graph::{NodeIndex, UnGraph};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::{Embedding, PatchCandidate};
use crate::similarity;

/// Probabilities are clamped into this band so no candidate is ever
/// reported as certain to fail or certain to succeed.
const PROB_FLOOR: f64 = 0.3;
const PROB_CEIL: f64 = 0.99;

/// Blend between raw conflict mass and partition-resolved conflict
const RESOLVED_BLEND: f64 = 0.3;

/// Edges weaker than this are not materialized
const EDGE_EPSILON: f64 = 1e-3;

/// Angle move tried per round when tuning the mixing parameter
const ANGLE_STEP: f64 = 0.1;

/// Result of one ranking pass.
#[derive(Debug, Clone)]
pub struct RankOutcome {
    /// Per-candidate success probability in insertion order
    pub probabilities: IndexMap<String, f64>,
    /// True when the greedy fallback replaced the max-cut search
    pub fallback: bool,
    /// True when the search stopped improving inside the round budget
    pub converged: bool,
}

pub struct ProbabilisticRanker {
    rounds: usize,
    fallback_threshold: usize,
}

impl ProbabilisticRanker {
    pub fn new(rounds: usize, fallback_threshold: usize) -> Self {
        Self { rounds, fallback_threshold }
    }

    /// Estimate a success probability for every candidate.
    ///
    /// Never fails: on non-convergence the best partition found so far is
    /// used and `converged` is reported false.
    pub fn rank(
        &self,
        candidates: &[PatchCandidate],
        embeddings: &FxHashMap<String, Arc<Embedding>>,
    ) -> RankOutcome {
        if candidates.is_empty() {
            return RankOutcome {
                probabilities: IndexMap::new(),
                fallback: false,
                converged: true,
            };
        }

        let graph = build_compatibility_graph(candidates, embeddings);

        if candidates.len() > self.fallback_threshold {
            info!(
                "ranker: {} candidates exceed threshold {}, using greedy fallback",
                candidates.len(),
                self.fallback_threshold
            );
            return greedy_rank(candidates, &graph);
        }

        self.max_cut_rank(candidates, &graph)
    }

    fn max_cut_rank(
        &self,
        candidates: &[PatchCandidate],
        graph: &UnGraph<usize, f64>,
    ) -> RankOutcome {
        let n = candidates.len();

        // Sweep order is fixed by candidate id so equal inputs always walk
        // the same path (documented tie-breaking convention).
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| candidates[a].id.cmp(&candidates[b].id));

        // Alternating initial partition over the id order
        let mut side = vec![1i8; n];
        for (pos, &idx) in order.iter().enumerate() {
            side[idx] = if pos % 2 == 0 { 1 } else { -1 };
        }

        let mut angle = std::f64::consts::FRAC_PI_4;
        let mut best_cut = cut_value(graph, &side, angle);
        let mut converged = false;

        for round in 0..self.rounds.max(1) {
            let mut improved = false;

            // Local search: flip any node that raises the cut
            for &idx in &order {
                side[idx] = -side[idx];
                let flipped = cut_value(graph, &side, angle);
                if flipped > best_cut + f64::EPSILON {
                    best_cut = flipped;
                    improved = true;
                } else {
                    side[idx] = -side[idx];
                }
            }

            // Variational step: nudge the mixing angle and keep improvements
            for trial in [angle + ANGLE_STEP, angle - ANGLE_STEP] {
                let value = cut_value(graph, &side, trial);
                if value > best_cut + f64::EPSILON {
                    best_cut = value;
                    angle = trial;
                    improved = true;
                }
            }

            if !improved {
                converged = true;
                debug!("ranker converged after {} round(s)", round + 1);
                break;
            }
        }

        if !converged {
            debug!("ranker round budget exhausted, returning best-found partition");
        }

        let probabilities = probabilities_from_partition(candidates, graph, &side, angle);
        RankOutcome { probabilities, fallback: false, converged }
    }
}

/// Build the conflict graph: nodes are candidate indices, edge weights
/// blend affected-symbol overlap with embedding fidelity.
fn build_compatibility_graph(
    candidates: &[PatchCandidate],
    embeddings: &FxHashMap<String, Arc<Embedding>>,
) -> UnGraph<usize, f64> {
    let mut graph = UnGraph::<usize, f64>::with_capacity(candidates.len(), 0);
    let nodes: Vec<NodeIndex> = (0..candidates.len()).map(|i| graph.add_node(i)).collect();

    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            let overlap = symbol_jaccard(&candidates[i], &candidates[j]);
            let fidelity = match (
                embeddings.get(&candidates[i].id),
                embeddings.get(&candidates[j].id),
            ) {
                (Some(a), Some(b)) => similarity::fidelity(a, b),
                _ => 0.0,
            };

            let weight = 0.5 * overlap + 0.5 * fidelity;
            if weight > EDGE_EPSILON {
                graph.add_edge(nodes[i], nodes[j], weight);
            }
        }
    }

    graph
}

fn symbol_jaccard(a: &PatchCandidate, b: &PatchCandidate) -> f64 {
    if a.affected_symbols.is_empty() && b.affected_symbols.is_empty() {
        return 0.0;
    }
    let sa: FxHashSet<&str> = a.affected_symbols.iter().map(String::as_str).collect();
    let sb: FxHashSet<&str> = b.affected_symbols.iter().map(String::as_str).collect();
    let intersection = sa.intersection(&sb).count() as f64;
    let union = sa.union(&sb).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Weighted cut: edges crossing the partition count with an angle-scaled
/// weight, the variational knob of the search.
fn cut_value(graph: &UnGraph<usize, f64>, side: &[i8], angle: f64) -> f64 {
    let scale = angle.sin().powi(2);
    graph
        .edge_indices()
        .map(|e| {
            let (a, b) = graph.edge_endpoints(e).expect("edge endpoints");
            let w = graph[e] * scale;
            if side[graph[a]] != side[graph[b]] {
                w
            } else {
                0.0
            }
        })
        .sum()
}

/// Per-node probability: low total conflict is good, and conflict that the
/// partition separated is partially forgiven.
fn probabilities_from_partition(
    candidates: &[PatchCandidate],
    graph: &UnGraph<usize, f64>,
    side: &[i8],
    _angle: f64,
) -> IndexMap<String, f64> {
    let n = candidates.len();
    let mut conflict = vec![0.0f64; n];
    let mut resolved = vec![0.0f64; n];

    for e in graph.edge_indices() {
        let (a, b) = graph.edge_endpoints(e).expect("edge endpoints");
        let (ia, ib) = (graph[a], graph[b]);
        let w = graph[e];
        conflict[ia] += w;
        conflict[ib] += w;
        if side[ia] != side[ib] {
            resolved[ia] += w;
            resolved[ib] += w;
        }
    }

    let total: f64 = conflict.iter().sum();
    let mut probabilities = IndexMap::with_capacity(n);

    for (idx, candidate) in candidates.iter().enumerate() {
        let base = if total > 0.0 { 1.0 - conflict[idx] / total } else { 0.75 };
        let resolved_fraction = if conflict[idx] > 0.0 {
            resolved[idx] / conflict[idx]
        } else {
            1.0
        };
        let p = base * (1.0 - RESOLVED_BLEND) + resolved_fraction * RESOLVED_BLEND;
        probabilities.insert(candidate.id.clone(), p.clamp(PROB_FLOOR, PROB_CEIL));
    }

    probabilities
}

/// Documented degradation path for large batches: probability from raw
/// conflict mass only, no partitioning.
fn greedy_rank(candidates: &[PatchCandidate], graph: &UnGraph<usize, f64>) -> RankOutcome {
    let n = candidates.len();
    let mut conflict = vec![0.0f64; n];

    for e in graph.edge_indices() {
        let (a, b) = graph.edge_endpoints(e).expect("edge endpoints");
        let w = graph[e];
        conflict[graph[a]] += w;
        conflict[graph[b]] += w;
    }

    let total: f64 = conflict.iter().sum();
    let mut probabilities = IndexMap::with_capacity(n);
    for (idx, candidate) in candidates.iter().enumerate() {
        let base = if total > 0.0 { 1.0 - conflict[idx] / total } else { 0.75 };
        probabilities.insert(candidate.id.clone(), base.clamp(PROB_FLOOR, PROB_CEIL));
    }

    RankOutcome { probabilities, fallback: true, converged: true }
}
