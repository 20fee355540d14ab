//! Analysis orchestrator
//!
//! Sequences the full pipeline for one `analyze` call:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                       Analyzer                         │
//! ├────────────────────────────────────────────────────────┤
//! │  1. Validate context + candidates                      │
//! │  2. Embed + smell-scan per candidate (rayon)           │
//! │  3. Rank success probabilities (compatibility graph)   │
//! │  4. Evaluate integration costs (rayon)                 │
//! │  5. Aggregate into the final ordered ranking           │
//! │  6. Assemble the report (smells, duplicates, summary)  │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! A failure scoring one candidate excludes that candidate with a
//! recorded reason; it never aborts the batch. The ranked order depends
//! only on combined scores, not on completion order of the parallel
//! stages, so concurrent `analyze` calls on one engine are safe: the only
//! shared state is the internally synchronized embedding cache.

use chrono::Utc;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::EmbeddingCache;
use crate::config::EngineConfig;
use crate::cost::CostEvaluator;
use crate::embed::FeatureEmbedder;
use crate::error::EngineError;
use crate::generate::CandidateSource;
use crate::models::{
    AnalysisStats, CodeContext, CodeSmell, Embedding, ExcludedCandidate, NearDuplicate,
    OptimizationReport, PatchCandidate, RankedCandidate,
};
use crate::ranker::ProbabilisticRanker;
use crate::scoring::{AggregateInput, RankingAggregator};
use crate::similarity;
use crate::smells::SmellEngine;

/// Fidelity at which two candidate bodies count as near-duplicates
const DUPLICATE_FIDELITY: f64 = 0.95;

/// Cooperative cancellation flag for an in-flight `analyze` call.
///
/// Cancelling stops the dispatch of new per-candidate work; work already
/// running finishes, and any embedding it commits to the cache stays
/// fully formed.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

struct CandidateEval {
    candidate: PatchCandidate,
    embedding: Arc<Embedding>,
    smells: Vec<CodeSmell>,
}

/// Top-level entry point coordinating the ranking pipeline.
pub struct Analyzer {
    config: EngineConfig,
    cache: Arc<EmbeddingCache>,
    embedder: FeatureEmbedder,
    smells: SmellEngine,
    ranker: ProbabilisticRanker,
    costs: CostEvaluator,
    aggregator: RankingAggregator,
    source: Option<Box<dyn CandidateSource>>,
}

impl Analyzer {
    /// Build an analyzer from a validated configuration.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let cache = Arc::new(EmbeddingCache::new(config.cache_capacity));
        Ok(Self {
            embedder: FeatureEmbedder::new(config.embedding_dim, Arc::clone(&cache)),
            smells: SmellEngine::new(),
            ranker: ProbabilisticRanker::new(config.optimization_rounds, config.fallback_threshold),
            costs: CostEvaluator::new(config.cost_iterations, config.seed),
            aggregator: RankingAggregator::new(config.probability_weight, config.cost_weight),
            source: None,
            cache,
            config,
        })
    }

    /// Analyzer with all defaults.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default()).expect("default config is valid")
    }

    /// Install a candidate source used when the caller supplies none.
    pub fn with_candidate_source(mut self, source: Box<dyn CandidateSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The shared embedding cache (for stats and warm-up).
    pub fn cache(&self) -> &Arc<EmbeddingCache> {
        &self.cache
    }

    /// Analyze caller-supplied candidates.
    pub fn analyze(
        &self,
        context: &CodeContext,
        candidates: Vec<PatchCandidate>,
    ) -> Result<OptimizationReport, EngineError> {
        self.analyze_cancellable(context, candidates, &CancelToken::new())
    }

    /// Analyze, generating candidates from the configured source when the
    /// caller passes `None`.
    pub fn analyze_with(
        &self,
        context: &CodeContext,
        candidates: Option<Vec<PatchCandidate>>,
    ) -> Result<OptimizationReport, EngineError> {
        let candidates = match candidates {
            Some(c) => c,
            None => {
                let source = self.source.as_ref().ok_or_else(|| {
                    EngineError::InvalidInput(
                        "no candidates supplied and no candidate source configured".into(),
                    )
                })?;
                source
                    .generate(context)
                    .map_err(|e| EngineError::InvalidInput(format!("candidate generation failed: {e}")))?
            }
        };
        self.analyze(context, candidates)
    }

    /// Analyze with cooperative cancellation.
    pub fn analyze_cancellable(
        &self,
        context: &CodeContext,
        candidates: Vec<PatchCandidate>,
        token: &CancelToken,
    ) -> Result<OptimizationReport, EngineError> {
        let started = Instant::now();
        validate_input(context, &candidates)?;
        let submitted = candidates.len();

        // Stage 1: per-candidate embedding + smell scan, embarrassingly
        // parallel. Cancellation skips candidates not yet dispatched.
        let evaluated: Vec<Result<CandidateEval, ExcludedCandidate>> = candidates
            .into_par_iter()
            .map(|candidate| {
                if token.is_cancelled() {
                    return Err(ExcludedCandidate {
                        id: candidate.id.clone(),
                        reason: "analysis cancelled".into(),
                    });
                }
                self.evaluate_candidate(candidate, context)
            })
            .collect();
        if token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let mut excluded = Vec::new();
        let mut evals = Vec::new();
        for result in evaluated {
            match result {
                Ok(eval) => evals.push(eval),
                Err(reason) => {
                    warn!("excluding candidate {}: {}", reason.id, reason.reason);
                    excluded.push(reason);
                }
            }
        }
        debug!("evaluated {} candidate(s), {} excluded", evals.len(), excluded.len());

        // Stage 2: success probabilities over the survivor set
        let survivors: Vec<PatchCandidate> =
            evals.iter().map(|e| e.candidate.clone()).collect();
        let embeddings: FxHashMap<String, Arc<Embedding>> = evals
            .iter()
            .map(|e| (e.candidate.id.clone(), Arc::clone(&e.embedding)))
            .collect();
        let rank_outcome = self.ranker.rank(&survivors, &embeddings);

        if token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        // Stage 3: integration costs, parallel per candidate
        let cost_outcomes: Vec<_> = survivors
            .par_iter()
            .map(|candidate| self.costs.evaluate(candidate, context))
            .collect();

        if token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        // Stage 4: aggregate into the final ordering
        let inputs: Vec<AggregateInput> = survivors
            .iter()
            .zip(&cost_outcomes)
            .map(|(candidate, cost)| AggregateInput {
                id: candidate.id.clone(),
                probability: rank_outcome.probabilities[&candidate.id],
                cost: cost.cost,
                symbol_count: candidate.affected_symbols.len(),
                degraded: !cost.converged || !rank_outcome.converged,
            })
            .collect();
        let scored = self.aggregator.aggregate(&inputs);

        // Stage 5: assemble the report
        let mut by_id: FxHashMap<String, CandidateEval> = evals
            .into_iter()
            .map(|e| (e.candidate.id.clone(), e))
            .collect();

        let duplicates = find_duplicates(&survivors, &embeddings);

        let mut smells: Vec<CodeSmell> = Vec::new();
        let mut ranked = Vec::with_capacity(scored.len());
        for (id, score) in scored {
            let eval = by_id.remove(&id).expect("scored candidate was evaluated");
            smells.extend(eval.smells);
            ranked.push(RankedCandidate { candidate: eval.candidate, score });
        }
        smells.sort_by(|a, b| {
            b.severity
                .partial_cmp(&a.severity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        let top_pick_id = ranked.first().map(|r| r.candidate.id.clone());
        let summary = render_summary(&ranked, &smells);
        let stats = AnalysisStats {
            candidates_submitted: submitted,
            candidates_ranked: ranked.len(),
            ranker_fallback: rank_outcome.fallback,
            ranker_converged: rank_outcome.converged,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            "analysis complete: {}/{} candidate(s) ranked, {} smell(s), {} duplicate pair(s) in {}ms",
            stats.candidates_ranked, submitted, smells.len(), duplicates.len(), stats.duration_ms
        );

        Ok(OptimizationReport {
            candidates: ranked,
            top_pick_id,
            smells,
            duplicates,
            excluded,
            stats,
            summary,
            generated_at: Utc::now(),
        })
    }

    /// Embed and smell-scan one candidate, or record why it was dropped.
    fn evaluate_candidate(
        &self,
        candidate: PatchCandidate,
        context: &CodeContext,
    ) -> Result<CandidateEval, ExcludedCandidate> {
        if !candidate.risk_score.is_finite() || !(0.0..=1.0).contains(&candidate.risk_score) {
            return Err(ExcludedCandidate {
                id: candidate.id,
                reason: "risk_score outside [0,1]".into(),
            });
        }
        if !candidate.complexity_score.is_finite() {
            return Err(ExcludedCandidate {
                id: candidate.id,
                reason: "complexity_score is not finite".into(),
            });
        }

        let embedding = self.embedder.embed(&candidate.body);
        let smells = self.smells.detect(&candidate, context);
        Ok(CandidateEval { candidate, embedding, smells })
    }
}

fn validate_input(
    context: &CodeContext,
    candidates: &[PatchCandidate],
) -> Result<(), EngineError> {
    if candidates.is_empty() {
        return Err(EngineError::InvalidInput("empty candidate list".into()));
    }
    if context.file_path.as_os_str().is_empty() {
        return Err(EngineError::InvalidInput("context has no file identity".into()));
    }

    let mut seen = rustc_hash::FxHashSet::default();
    for candidate in candidates {
        if candidate.id.is_empty() {
            return Err(EngineError::InvalidInput("candidate with empty id".into()));
        }
        if !seen.insert(candidate.id.as_str()) {
            return Err(EngineError::InvalidInput(format!(
                "duplicate candidate id: {}",
                candidate.id
            )));
        }
    }
    Ok(())
}

/// Candidate pairs whose bodies embed nearly identically.
fn find_duplicates(
    candidates: &[PatchCandidate],
    embeddings: &FxHashMap<String, Arc<Embedding>>,
) -> Vec<NearDuplicate> {
    let mut duplicates = Vec::new();
    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            let (Some(a), Some(b)) = (
                embeddings.get(&candidates[i].id),
                embeddings.get(&candidates[j].id),
            ) else {
                continue;
            };
            let fidelity = similarity::fidelity(a, b);
            if fidelity >= DUPLICATE_FIDELITY {
                let mut pair = [candidates[i].id.clone(), candidates[j].id.clone()];
                pair.sort();
                let [first_id, second_id] = pair;
                duplicates.push(NearDuplicate { first_id, second_id, fidelity });
            }
        }
    }
    duplicates.sort_by(|a, b| {
        a.first_id
            .cmp(&b.first_id)
            .then_with(|| a.second_id.cmp(&b.second_id))
    });
    duplicates
}

/// Deterministic plain-text outcome summary.
fn render_summary(ranked: &[RankedCandidate], smells: &[CodeSmell]) -> String {
    let mut summary = String::new();

    if let Some(top) = ranked.first() {
        summary.push_str(&format!("Top patch: {}\n", top.candidate.id));
        summary.push_str(&format!(
            "Success probability: {:.1}%\n",
            top.score.success_probability * 100.0
        ));
        summary.push_str(&format!("Combined score: {:.3}\n", top.score.combined_score));
        summary.push_str(&format!("Rationale: {}\n", top.score.rationale));
    } else {
        summary.push_str("No candidates survived scoring.\n");
    }

    if !smells.is_empty() {
        summary.push_str(&format!("\nCode smells detected: {}\n", smells.len()));
        for smell in smells.iter().take(3) {
            summary.push_str(&format!(
                "  - {} (severity: {:.0}%)\n",
                smell.kind,
                smell.severity * 100.0
            ));
        }
    }

    summary
}
