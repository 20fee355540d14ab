//! Engine configuration
//!
//! Callers configure the engine programmatically through the builder
//! methods or by loading a `patchrank.toml` table. Every knob has a
//! default matching the reference behavior, so `EngineConfig::default()`
//! is always valid.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::EngineError;

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIM: usize = 1024;
/// Default optimization round budget for the probabilistic ranker
pub const DEFAULT_OPTIMIZATION_ROUNDS: usize = 3;
/// Default iteration budget for the cost evaluator
pub const DEFAULT_COST_ITERATIONS: usize = 5;
/// Default weight on success probability in the combined score
pub const DEFAULT_PROBABILITY_WEIGHT: f64 = 0.6;
/// Default weight on normalized cost in the combined score
pub const DEFAULT_COST_WEIGHT: f64 = 0.4;
/// Candidate count above which the ranker degrades to the greedy heuristic
pub const DEFAULT_FALLBACK_THRESHOLD: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Length of embedding vectors
    pub embedding_dim: usize,
    /// Round budget for the max-cut local search
    pub optimization_rounds: usize,
    /// Iteration budget for cost minimization
    pub cost_iterations: usize,
    /// Weight on success probability in the combined score
    pub probability_weight: f64,
    /// Weight on normalized integration cost in the combined score
    pub cost_weight: f64,
    /// Candidate count at which the ranker switches to the greedy fallback
    pub fallback_threshold: usize,
    /// Maximum embedding cache entries; `None` = unbounded
    pub cache_capacity: Option<usize>,
    /// Fixed random seed for the cost evaluator; `None` seeds per candidate
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            optimization_rounds: DEFAULT_OPTIMIZATION_ROUNDS,
            cost_iterations: DEFAULT_COST_ITERATIONS,
            probability_weight: DEFAULT_PROBABILITY_WEIGHT,
            cost_weight: DEFAULT_COST_WEIGHT,
            fallback_threshold: DEFAULT_FALLBACK_THRESHOLD,
            cache_capacity: None,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    pub fn with_optimization_rounds(mut self, rounds: usize) -> Self {
        self.optimization_rounds = rounds;
        self
    }

    pub fn with_cost_iterations(mut self, iterations: usize) -> Self {
        self.cost_iterations = iterations;
        self
    }

    pub fn with_score_weights(mut self, probability: f64, cost: f64) -> Self {
        self.probability_weight = probability;
        self.cost_weight = cost;
        self
    }

    pub fn with_fallback_threshold(mut self, threshold: usize) -> Self {
        self.fallback_threshold = threshold;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Parse a config from a TOML document with a `[patchrank]` table,
    /// falling back to top-level keys when the table is absent.
    pub fn from_toml_str(text: &str) -> Result<Self, EngineError> {
        #[derive(Deserialize)]
        struct Wrapper {
            patchrank: Option<EngineConfig>,
            #[serde(flatten)]
            flat: Option<EngineConfig>,
        }

        let wrapper: Wrapper = toml::from_str(text)
            .map_err(|e| EngineError::Config(format!("toml parse error: {e}")))?;
        let config = wrapper
            .patchrank
            .or(wrapper.flat)
            .unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.embedding_dim == 0 {
            return Err(EngineError::Config("embedding_dim must be > 0".into()));
        }
        if !self.probability_weight.is_finite() || !self.cost_weight.is_finite() {
            return Err(EngineError::Config("score weights must be finite".into()));
        }
        if self.probability_weight <= 0.0 && self.cost_weight <= 0.0 {
            return Err(EngineError::Config(
                "at least one score weight must be positive".into(),
            ));
        }
        if let Some(0) = self.cache_capacity {
            return Err(EngineError::Config("cache_capacity must be > 0 when set".into()));
        }
        Ok(())
    }
}
