//! Core data models for patchrank
//!
//! These models are used throughout the crate for representing analysis
//! inputs (contexts, candidate patches), intermediate values (embeddings,
//! smells) and the final ranked report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::embed::FeatureVector;

/// Generate a deterministic smell ID based on content hash.
///
/// Stable IDs keep reports reproducible across runs, enabling:
/// - Comparing two reports for the same input
/// - Suppression by ID in caller-side config
/// - Reliable deduplication when several candidates share a smell
///
/// The ID is a 16-character hex string derived from hashing:
/// - detector name (which detector found it)
/// - candidate id (where it was found)
/// - line number (specific location)
/// - title (what the issue is)
pub fn deterministic_smell_id(detector: &str, candidate: &str, line: u32, title: &str) -> String {
    // MD5 for stable cross-version hashing; DefaultHasher is intentionally
    // not stable across Rust/compiler versions.
    let input = format!("{detector}\n{candidate}\n{line}\n{title}");
    let digest = md5::compute(input.as_bytes());
    format!("{:x}", digest)[..16].to_string()
}

/// Kinds of code patches a candidate can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PatchType {
    BugFix,
    Performance,
    #[default]
    Refactoring,
    Security,
    Maintainability,
}

impl std::fmt::Display for PatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatchType::BugFix => write!(f, "bug_fix"),
            PatchType::Performance => write!(f, "performance"),
            PatchType::Refactoring => write!(f, "refactoring"),
            PatchType::Security => write!(f, "security"),
            PatchType::Maintainability => write!(f, "maintainability"),
        }
    }
}

/// Smell categories reported by the similarity engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmellKind {
    DuplicateCode,
    LongMethod,
    DeadCode,
    DeepNesting,
    LargeClass,
    ComplexLogic,
    PoorNaming,
    TightCoupling,
    MissingTests,
}

impl std::fmt::Display for SmellKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SmellKind::DuplicateCode => "duplicate_code",
            SmellKind::LongMethod => "long_method",
            SmellKind::DeadCode => "dead_code",
            SmellKind::DeepNesting => "deep_nesting",
            SmellKind::LargeClass => "large_class",
            SmellKind::ComplexLogic => "complex_logic",
            SmellKind::PoorNaming => "poor_naming",
            SmellKind::TightCoupling => "tight_coupling",
            SmellKind::MissingTests => "missing_tests",
        };
        write!(f, "{s}")
    }
}

/// One diff hunk from the caller's change set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffHunk {
    /// 1-based line where the hunk starts in the target file
    pub start_line: u32,
    /// Number of lines covered by the hunk
    pub line_count: u32,
    /// Raw hunk body (added/changed lines)
    pub body: String,
}

impl DiffHunk {
    pub fn new(start_line: u32, body: impl Into<String>) -> Self {
        let body = body.into();
        let line_count = body.lines().count() as u32;
        Self { start_line, line_count, body }
    }
}

/// Immutable analysis input: the code being changed plus recent diff hunks.
///
/// Created by the caller per analysis request; read-only within the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeContext {
    /// Current source text of the file under change
    pub source: String,
    /// Identity of the file under change
    pub file_path: PathBuf,
    /// Recent diff hunks against this file
    pub hunks: Vec<DiffHunk>,
}

impl CodeContext {
    pub fn new(source: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            file_path: file_path.into(),
            hunks: Vec::new(),
        }
    }

    pub fn with_hunks(mut self, hunks: Vec<DiffHunk>) -> Self {
        self.hunks = hunks;
        self
    }
}

/// One proposed change. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchCandidate {
    /// Unique id within one analysis request
    pub id: String,
    /// Diff/patch body of the proposed change
    pub body: String,
    pub patch_type: PatchType,
    /// Short human-readable description of the change
    #[serde(default)]
    pub description: String,
    /// Heuristic risk in [0,1], higher = riskier
    pub risk_score: f64,
    /// Relative size of the change in [0,1]
    #[serde(default)]
    pub complexity_score: f64,
    /// Symbol names touched by the change
    #[serde(default)]
    pub affected_symbols: Vec<String>,
}

impl PatchCandidate {
    pub fn new(id: impl Into<String>, body: impl Into<String>, patch_type: PatchType) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            patch_type,
            description: String::new(),
            risk_score: 0.0,
            complexity_score: 0.0,
            affected_symbols: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_risk(mut self, risk: f64) -> Self {
        self.risk_score = risk.clamp(0.0, 1.0);
        self
    }

    pub fn with_complexity(mut self, complexity: f64) -> Self {
        self.complexity_score = complexity.clamp(0.0, 1.0);
        self
    }

    pub fn with_symbols(mut self, symbols: Vec<String>) -> Self {
        self.affected_symbols = symbols;
        self
    }
}

/// Fixed-dimension unit-normalized feature vector for a code fragment.
///
/// Invariant: the L2 norm of `vector` is 1.0 within floating-point
/// tolerance. Created once per distinct input text and cached by hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    /// SHA-256 of the input text, used as the cache key
    pub hash: String,
    /// Embedding dimension (vector length)
    pub dim: usize,
    /// Unit-normalized projection of the extracted features
    pub vector: Vec<f32>,
    /// The eight scalar features the vector was projected from
    pub features: FeatureVector,
}

impl Embedding {
    /// L2 norm of the vector. Should always be ~1.0.
    pub fn norm(&self) -> f64 {
        self.vector.iter().map(|v| (*v as f64) * (*v as f64)).sum::<f64>().sqrt()
    }
}

/// Banding of a pairwise similarity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityClass {
    /// Fidelity above 0.95
    Exact,
    /// Fidelity above 0.7
    Semantic,
    /// Everything below
    Pattern,
}

/// Result of comparing two embeddings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub hash_a: String,
    pub hash_b: String,
    /// Squared inner product of the two unit vectors, in [0,1]
    pub fidelity: f64,
    pub class: SimilarityClass,
    /// Symbol names appearing in both compared bodies
    pub overlapping_symbols: Vec<String>,
}

/// A structurally detected quality issue in a candidate body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSmell {
    /// Deterministic content-derived id
    pub id: String,
    pub kind: SmellKind,
    /// Name of the detector that produced this smell
    pub detector: String,
    /// Structural severity in [0,1]
    pub severity: f64,
    /// Agreement-derived confidence in [0,1]
    pub confidence: f64,
    /// 1-based start line within the candidate body
    pub line_start: u32,
    /// 1-based end line within the candidate body
    pub line_end: u32,
    pub description: String,
    #[serde(default)]
    pub suggested_fix: Option<String>,
}

/// Per-candidate ranking outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingScore {
    /// Estimated success probability in [0,1]
    pub success_probability: f64,
    /// Estimated integration cost, >= 0
    pub integration_cost: f64,
    /// Weighted combination of probability and normalized cost
    pub combined_score: f64,
    /// Rank position, 1 = best
    pub rank: usize,
    /// Threshold-banded explanation, never free-form text
    pub rationale: String,
    /// True when the ranker or cost evaluator returned a best-effort
    /// estimate without converging inside its iteration budget
    #[serde(default)]
    pub degraded: bool,
}

/// A candidate paired with its score, in final rank order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub candidate: PatchCandidate,
    pub score: RankingScore,
}

/// A candidate dropped from the ranking, with the recorded reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcludedCandidate {
    pub id: String,
    pub reason: String,
}

/// Two candidates whose bodies embed nearly identically
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearDuplicate {
    pub first_id: String,
    pub second_id: String,
    pub fidelity: f64,
}

/// Stage-level statistics for one analysis run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// Candidates received (before exclusions)
    pub candidates_submitted: usize,
    /// Candidates present in the final ranking
    pub candidates_ranked: usize,
    /// True when the ranker switched to the greedy fallback
    pub ranker_fallback: bool,
    /// True when the ranker converged within its round budget
    pub ranker_converged: bool,
    /// Wall-clock duration of the whole analysis in milliseconds
    pub duration_ms: u64,
}

/// Final output aggregate of one `analyze` call.
///
/// Owned by the caller after return; the engine holds no reference to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    /// Ranked candidates, best first
    pub candidates: Vec<RankedCandidate>,
    /// Id of the top-ranked candidate, if any survived scoring
    pub top_pick_id: Option<String>,
    /// Smells collected across all candidate bodies, highest severity first
    pub smells: Vec<CodeSmell>,
    /// Candidate pairs with near-identical embeddings
    pub duplicates: Vec<NearDuplicate>,
    /// Candidates dropped during evaluation, with reasons
    pub excluded: Vec<ExcludedCandidate>,
    pub stats: AnalysisStats,
    /// Deterministic plain-text summary of the outcome
    pub summary: String,
    pub generated_at: DateTime<Utc>,
}

impl OptimizationReport {
    /// The top-ranked candidate, if any.
    pub fn top_pick(&self) -> Option<&RankedCandidate> {
        self.candidates.first()
    }
}
