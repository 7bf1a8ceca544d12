//! Embedding abstraction and dense search
//!
//! The embedding model is an opaque collaborator; this module fixes the
//! contract (`embed` -> normalised vector) and ships a deterministic
//! feature-hashing embedder so the pipeline runs without an external model.

use sha2::{Digest, Sha256};

/// Trait for embedding generation
pub trait Embedder: Send + Sync {
    /// Generate a normalised embedding for a single text
    fn embed(&self, text: &str) -> Vec<f32>;

    /// Generate embeddings for multiple texts
    fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;
}

/// Deterministic bag-of-words feature-hashing embedder.
///
/// Each token hashes into one of `dimension` buckets with a sign; the
/// resulting vector is L2-normalised. Identical texts embed identically,
/// which is all the in-process pipeline needs.
pub struct HashingEmbedder {
    name: String,
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self { name: name.into(), dimension }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new("feature-hashing-384", 384)
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() >= 2)
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let bucket = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize
                % self.dimension;
            let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
            vec[bucket] += sign;
        }

        let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vec {
                *v /= norm;
            }
        }
        vec
    }

    fn model_name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Dense search: cosine similarity of the query against candidate vectors,
/// returning `(index, score)` sorted by score descending.
pub fn search_dense(
    query_embedding: &[f32],
    candidate_embeddings: &[Vec<f32>],
    top_k: usize,
) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = candidate_embeddings
        .iter()
        .enumerate()
        .map(|(i, cand)| (i, cosine_similarity(query_embedding, cand)))
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_is_deterministic_and_normalised() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("transformers improve translation quality");
        let b = embedder.embed("transformers improve translation quality");
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_similar_text_scores_higher() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed("neural network training");
        let close = embedder.embed("training a neural network");
        let far = embedder.embed("medieval castle architecture");

        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[test]
    fn test_search_dense_orders_by_similarity() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed("graph neural networks");
        let candidates = vec![
            embedder.embed("cooking pasta recipes"),
            embedder.embed("graph neural networks for molecules"),
            embedder.embed("weather forecast models"),
        ];

        let results = search_dense(&query, &candidates, 3);
        assert_eq!(results[0].0, 1);
    }

    #[test]
    fn test_empty_candidates() {
        assert!(search_dense(&[1.0, 0.0], &[], 5).is_empty());
    }

    #[test]
    fn test_zero_vector_similarity() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
