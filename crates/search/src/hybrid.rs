//! Hybrid search: late fusion of BM25 and dense results
//!
//! Per-source z-score normalisation, then
//! `score = alpha * bm25 + (1 - alpha) * dense` with 0 for a missing side.

use std::collections::HashMap;

/// Z-score normalisation. A zero-variance list maps to all ones.
pub fn normalize_scores(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }

    let n = scores.len() as f32;
    let mean = scores.iter().sum::<f32>() / n;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / n;
    let std = variance.sqrt();

    if std == 0.0 {
        return vec![1.0; scores.len()];
    }

    scores.iter().map(|s| (s - mean) / std).collect()
}

/// One fused candidate with its per-source normalised scores.
///
/// A side the document was absent from contributes (and records) 0.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedCandidate {
    pub doc_id: String,
    pub score_bm25: f32,
    pub score_dense: f32,
    pub score_final: f32,
}

/// Combine BM25 and dense results by doc id.
///
/// `dense_to_doc_id` maps a dense candidate index to its document id.
/// Returns candidates sorted by fused score descending, truncated to
/// `top_k`.
pub fn hybrid_search(
    bm25_results: &[(String, f32)],
    dense_results: &[(usize, f32)],
    dense_to_doc_id: &HashMap<usize, String>,
    alpha: f32,
    top_k: usize,
) -> Vec<FusedCandidate> {
    let bm25_normalized = normalize_scores(&bm25_results.iter().map(|(_, s)| *s).collect::<Vec<_>>());
    let dense_normalized =
        normalize_scores(&dense_results.iter().map(|(_, s)| *s).collect::<Vec<_>>());

    let bm25_map: HashMap<&str, f32> = bm25_results
        .iter()
        .zip(&bm25_normalized)
        .map(|((doc_id, _), score)| (doc_id.as_str(), *score))
        .collect();

    let mut dense_map: HashMap<&str, f32> = HashMap::new();
    for ((idx, _), score) in dense_results.iter().zip(&dense_normalized) {
        if let Some(doc_id) = dense_to_doc_id.get(idx) {
            dense_map.insert(doc_id.as_str(), *score);
        }
    }

    let mut combined: HashMap<String, FusedCandidate> = HashMap::new();
    for doc_id in bm25_map.keys().chain(dense_map.keys()) {
        let score_bm25 = bm25_map.get(doc_id).copied().unwrap_or(0.0);
        let score_dense = dense_map.get(doc_id).copied().unwrap_or(0.0);
        combined.insert(
            doc_id.to_string(),
            FusedCandidate {
                doc_id: doc_id.to_string(),
                score_bm25,
                score_dense,
                score_final: alpha * score_bm25 + (1.0 - alpha) * score_dense,
            },
        );
    }

    let mut sorted: Vec<FusedCandidate> = combined.into_values().collect();
    sorted.sort_by(|a, b| {
        b.score_final.partial_cmp(&a.score_final).unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted.truncate(top_k);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_empty() {
        assert!(normalize_scores(&[]).is_empty());
    }

    #[test]
    fn test_normalize_constant_scores() {
        assert_eq!(normalize_scores(&[2.0, 2.0, 2.0]), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_normalize_zero_mean() {
        let normalized = normalize_scores(&[1.0, 2.0, 3.0]);
        let mean: f32 = normalized.iter().sum::<f32>() / 3.0;
        assert!(mean.abs() < 1e-6);
    }

    #[test]
    fn test_hybrid_prefers_doc_in_both_sources() {
        // "b" appears highly ranked in both sources, "a" only in BM25,
        // "c" only in dense.
        let bm25 = vec![("b".to_string(), 8.0), ("a".to_string(), 5.0)];
        let dense = vec![(0, 0.9), (1, 0.4)];
        let mapping: HashMap<usize, String> =
            [(0, "b".to_string()), (1, "c".to_string())].into_iter().collect();

        let fused = hybrid_search(&bm25, &dense, &mapping, 0.5, 10);
        assert_eq!(fused[0].doc_id, "b");
    }

    #[test]
    fn test_component_scores_carried_through() {
        let bm25 = vec![("b".to_string(), 8.0), ("a".to_string(), 5.0)];
        let dense = vec![(0, 0.9), (1, 0.4)];
        let mapping: HashMap<usize, String> =
            [(0, "b".to_string()), (1, "c".to_string())].into_iter().collect();

        let fused = hybrid_search(&bm25, &dense, &mapping, 0.5, 10);

        // "b" carries a real normalised score from each side.
        let b = fused.iter().find(|c| c.doc_id == "b").unwrap();
        assert!(b.score_bm25 > 0.0);
        assert!(b.score_dense > 0.0);
        assert!((b.score_final - (0.5 * b.score_bm25 + 0.5 * b.score_dense)).abs() < 1e-6);

        // "c" was only retrieved densely; the missing side records 0.
        let c = fused.iter().find(|c| c.doc_id == "c").unwrap();
        assert_eq!(c.score_bm25, 0.0);
        assert!(c.score_dense != 0.0);
    }

    #[test]
    fn test_alpha_one_is_pure_bm25() {
        let bm25 = vec![("a".to_string(), 9.0), ("b".to_string(), 1.0)];
        let dense = vec![(0, 0.99)];
        let mapping: HashMap<usize, String> = [(0, "b".to_string())].into_iter().collect();

        let fused = hybrid_search(&bm25, &dense, &mapping, 1.0, 10);
        assert_eq!(fused[0].doc_id, "a");
    }

    #[test]
    fn test_top_k_limit() {
        let bm25: Vec<(String, f32)> = (0..10).map(|i| (format!("d{i}"), i as f32)).collect();
        let fused = hybrid_search(&bm25, &[], &HashMap::new(), 0.5, 3);
        assert_eq!(fused.len(), 3);
    }
}
