//! Cross-encoder reranking
//!
//! The reranker model is an opaque collaborator. A missing reranker falls
//! back to preserving input order with unit scores.

/// Candidate passed to the reranker
#[derive(Debug, Clone)]
pub struct RerankCandidate {
    pub title: String,
    pub abstract_text: String,
}

/// Re-rank candidates against a query
pub trait Reranker: Send + Sync {
    /// Returns `(index, rerank_score)` sorted by score descending,
    /// truncated to `top_k`.
    fn rerank(&self, query: &str, candidates: &[RerankCandidate], top_k: usize) -> Vec<(usize, f32)>;
}

/// Fallback reranker: original order, dummy scores
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReranker;

impl Reranker for NoopReranker {
    fn rerank(
        &self,
        _query: &str,
        candidates: &[RerankCandidate],
        top_k: usize,
    ) -> Vec<(usize, f32)> {
        (0..candidates.len().min(top_k)).map(|i| (i, 1.0)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_preserves_order() {
        let candidates = vec![
            RerankCandidate { title: "A".into(), abstract_text: String::new() },
            RerankCandidate { title: "B".into(), abstract_text: String::new() },
            RerankCandidate { title: "C".into(), abstract_text: String::new() },
        ];
        let ranked = NoopReranker.rerank("query", &candidates, 2);
        assert_eq!(ranked, vec![(0, 1.0), (1, 1.0)]);
    }

    #[test]
    fn test_noop_empty_candidates() {
        assert!(NoopReranker.rerank("query", &[], 5).is_empty());
    }
}
