//! Feature embedding
//!
//! Converts a code fragment into a fixed-length unit vector: extract eight
//! scalar features, project them through a ChaCha-seeded pseudo-random
//! projection, L2-normalize. The projection seed is derived from the
//! feature bits, so identical input text always produces an identical
//! vector and embeddings are safe to cache by content hash.

mod features;

pub use features::FeatureVector;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::cache::EmbeddingCache;
use crate::models::Embedding;

/// SHA-256 hex digest of a text fragment, the embedding cache key.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Converts code fragments into cached unit-normalized embeddings.
pub struct FeatureEmbedder {
    dim: usize,
    cache: Arc<EmbeddingCache>,
}

impl FeatureEmbedder {
    pub fn new(dim: usize, cache: Arc<EmbeddingCache>) -> Self {
        Self { dim, cache }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embed a text fragment, returning the cached vector on repeat input.
    ///
    /// Empty or non-code input embeds to the canonical basis vector rather
    /// than erroring, so downstream stages never see a missing embedding.
    pub fn embed(&self, text: &str) -> Arc<Embedding> {
        let hash = content_hash(text);
        self.cache
            .get_or_insert_with(&hash, || self.compute(text, &hash))
    }

    fn compute(&self, text: &str, hash: &str) -> Embedding {
        let features = FeatureVector::extract(text);
        let vector = project(&features, self.dim);
        Embedding {
            hash: hash.to_string(),
            dim: self.dim,
            vector,
            features,
        }
    }
}

/// Project a feature vector into `dim` dimensions and L2-normalize.
///
/// The RNG seed folds in every feature's bit pattern, which makes the
/// projection a pure function of the features.
fn project(features: &FeatureVector, dim: usize) -> Vec<f32> {
    if features.is_zero() {
        return canonical_unit(dim);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(feature_seed(features));
    let raw = features.as_array();

    let mut vector: Vec<f32> = (0..dim)
        .map(|i| {
            let base: f32 = rng.random::<f32>() * 2.0 - 1.0;
            // Imprint the raw feature magnitudes over the random basis so
            // nearby feature vectors land on nearby embeddings.
            base * (0.5 + raw[i % raw.len()])
        })
        .collect();

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return canonical_unit(dim);
    }
    for v in &mut vector {
        *v /= norm;
    }
    vector
}

/// The canonical unit vector used for zero-feature input.
fn canonical_unit(dim: usize) -> Vec<f32> {
    let mut v = vec![0.0; dim.max(1)];
    v[0] = 1.0;
    v
}

fn feature_seed(features: &FeatureVector) -> u64 {
    features
        .as_array()
        .iter()
        .fold(0xcbf2_9ce4_8422_2325u64, |acc, f| {
            (acc ^ f.to_bits() as u64).wrapping_mul(0x100_0000_01b3)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EmbeddingCache;

    fn embedder(dim: usize) -> FeatureEmbedder {
        FeatureEmbedder::new(dim, Arc::new(EmbeddingCache::unbounded()))
    }

    #[test]
    fn test_embedding_is_unit_norm() {
        let e = embedder(256).embed("fn add(a: i32, b: i32) -> i32 { a + b }");
        assert!((e.norm() - 1.0).abs() < 1e-6);
        assert_eq!(e.vector.len(), 256);
    }

    #[test]
    fn test_embedding_deterministic() {
        let em = embedder(512);
        let a = em.embed("let x = compute(y);");
        let b = em.embed("let x = compute(y);");
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.vector, b.vector);
    }

    #[test]
    fn test_empty_input_canonical_vector() {
        let e = embedder(128).embed("");
        assert_eq!(e.vector[0], 1.0);
        assert!(e.vector[1..].iter().all(|v| *v == 0.0));
        assert!((e.norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_different_text_different_vectors() {
        let em = embedder(256);
        let a = em.embed("fn f() { loop { if x { break; } } }");
        let b = em.embed("const GREETING: &str = \"hello\";");
        assert_ne!(a.hash, b.hash);
        assert_ne!(a.vector, b.vector);
    }

    #[test]
    fn test_cache_hit_returns_same_allocation() {
        let em = embedder(64);
        let a = em.embed("x");
        let b = em.embed("x");
        assert!(Arc::ptr_eq(&a, &b));
    }
}
