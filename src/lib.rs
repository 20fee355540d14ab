//! patchrank: patch optimization and ranking engine
//!
//! Given a code-change context and a set of candidate patches, the engine
//! scores every candidate by success probability and integration cost and
//! returns a ranked report with a single recommendation:
//!
//! ```text
//! context ─▶ candidates ─▶ embeddings ─▶ (similarity, smells)
//!                                     └▶ (probability, cost) ─▶ ranking ─▶ report
//! ```
//!
//! The heavy lifting is classical throughout: a seeded pseudo-random
//! feature projection for embeddings, a round-bounded max-cut local
//! search for success probabilities, and perturb-and-accept minimization
//! for integration costs.
//!
//! # Example
//!
//! ```
//! use patchrank::{Analyzer, CodeContext, PatchCandidate, PatchType};
//!
//! let analyzer = Analyzer::with_defaults();
//! let context = CodeContext::new("fn main() { run(); }", "src/main.rs");
//! let candidates = vec![
//!     PatchCandidate::new("fix-null", "fn main() { run_checked(); }", PatchType::BugFix)
//!         .with_risk(0.3),
//! ];
//!
//! let report = analyzer.analyze(&context, candidates).unwrap();
//! assert_eq!(report.top_pick_id.as_deref(), Some("fix-null"));
//! ```

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod cost;
pub mod embed;
pub mod error;
pub mod generate;
pub mod models;
pub mod ranker;
pub mod scoring;
pub mod similarity;
pub mod smells;

pub use analyzer::{Analyzer, CancelToken};
pub use cache::EmbeddingCache;
pub use config::EngineConfig;
pub use error::EngineError;
pub use generate::{CandidateSource, HunkCandidateSource};
pub use models::{
    AnalysisStats, CodeContext, CodeSmell, DiffHunk, Embedding, ExcludedCandidate, NearDuplicate,
    OptimizationReport, PatchCandidate, PatchType, RankedCandidate, RankingScore, SimilarityClass,
    SimilarityResult, SmellKind,
};
