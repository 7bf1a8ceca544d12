//! Citation suggestion over the hybrid retrieval pipeline
//!
//! Per claim: expand the query with the section label, fetch BM25 and dense
//! candidates, fuse, rerank the fused pool, dedupe by document id, and keep
//! the top-k above the score threshold. Without a corpus every claim gets
//! an empty candidate list and downstream consumers tolerate that.

use crate::claims::Claim;
use arandu_common::config::RagConfig;
use arandu_search::{CitationCorpus, RerankCandidate, Reranker};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A citation candidate with its retrieval scores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationCandidate {
    pub doc_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub venue: Option<String>,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub score_sparse: f32,
    pub score_dense: f32,
    pub score_final: f32,
    pub score_rerank: f32,
    pub justification: String,
}

/// Suggest citations for a single claim.
pub fn suggest_citations(
    claim: &Claim,
    corpus: Option<&CitationCorpus>,
    reranker: &dyn Reranker,
    config: &RagConfig,
) -> Vec<CitationCandidate> {
    if !config.enabled {
        return Vec::new();
    }
    let Some(corpus) = corpus else {
        debug!(claim_id = %claim.id, "No citation corpus configured");
        return Vec::new();
    };
    if corpus.is_empty() {
        return Vec::new();
    }

    // Query expansion: section label + claim text.
    let query = match &claim.section {
        Some(section) => format!("{section} {}", claim.text),
        None => claim.text.clone(),
    };

    // Hybrid fusion of BM25 and dense candidates.
    let alpha = 1.0 - config.dense_weight;
    let fused = corpus.search(&query, alpha, 50);
    if fused.is_empty() {
        return Vec::new();
    }

    // Rerank the fused pool; a missing reranker preserves order. The input
    // stays index-aligned with `fused` so rerank indices resolve back.
    let rerank_input: Vec<RerankCandidate> = fused
        .iter()
        .map(|candidate| match corpus.get(&candidate.doc_id) {
            Some(doc) => RerankCandidate {
                title: doc.title.clone(),
                abstract_text: doc.abstract_text.clone(),
            },
            None => RerankCandidate { title: String::new(), abstract_text: String::new() },
        })
        .collect();
    let reranked = reranker.rerank(&query, &rerank_input, fused.len());

    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();
    for (index, rerank_score) in reranked {
        let Some(fused_candidate) = fused.get(index) else { continue };
        if !seen.insert(fused_candidate.doc_id.clone()) {
            continue;
        }
        if fused_candidate.score_final < config.min_score {
            continue;
        }
        let Some(doc) = corpus.get(&fused_candidate.doc_id) else { continue };

        candidates.push(CitationCandidate {
            doc_id: doc.id.clone(),
            title: doc.title.clone(),
            authors: doc.authors.clone(),
            venue: doc.venue.clone(),
            year: doc.year,
            doi: doc.doi.clone(),
            url: doc.url.clone(),
            score_sparse: fused_candidate.score_bm25,
            score_dense: fused_candidate.score_dense,
            score_final: fused_candidate.score_final,
            score_rerank: rerank_score,
            justification: format!("Retrieved for claim {}", claim.id),
        });

        if candidates.len() >= config.top_k {
            break;
        }
    }

    candidates
}

/// Suggest citations for every claim, keyed by claim id.
pub fn suggest_citations_for_claims(
    claims: &[Claim],
    corpus: Option<&CitationCorpus>,
    reranker: &dyn Reranker,
    config: &RagConfig,
) -> HashMap<String, Vec<CitationCandidate>> {
    claims
        .iter()
        .map(|claim| (claim.id.clone(), suggest_citations(claim, corpus, reranker, config)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arandu_search::{CorpusDocument, HashingEmbedder, NoopReranker};
    use std::sync::Arc;

    fn claim(id: &str, text: &str) -> Claim {
        Claim {
            id: id.to_string(),
            text: text.to_string(),
            section: Some("results".to_string()),
            spans: vec![],
            confidence: 0.7,
        }
    }

    #[test]
    fn test_no_corpus_yields_empty_lists() {
        let claims = vec![claim("c0", "Our transformer achieves superior accuracy.")];
        let config = RagConfig::default();
        let citations = suggest_citations_for_claims(&claims, None, &NoopReranker, &config);
        assert_eq!(citations.len(), 1);
        assert!(citations["c0"].is_empty());
    }

    #[test]
    fn test_rag_disabled_yields_empty() {
        let mut corpus = CitationCorpus::new(Arc::new(HashingEmbedder::default()));
        corpus.add_document(CorpusDocument {
            id: "d1".into(),
            title: "Transformers".into(),
            authors: vec![],
            abstract_text: "attention models".into(),
            venue: None,
            year: None,
            doi: None,
            url: None,
        });

        let config = RagConfig { enabled: false, ..Default::default() };
        let result = suggest_citations(
            &claim("c0", "Our transformer achieves superior accuracy."),
            Some(&corpus),
            &NoopReranker,
            &config,
        );
        assert!(result.is_empty());
    }

    #[test]
    fn test_corpus_search_returns_scored_candidates() {
        let mut corpus = CitationCorpus::new(Arc::new(HashingEmbedder::default()));
        for (id, title, abs) in [
            ("d1", "Attention is all you need", "transformer attention architecture"),
            ("d2", "ResNet", "residual convolutional networks"),
            ("d3", "BERT", "bidirectional transformer pretraining"),
        ] {
            corpus.add_document(CorpusDocument {
                id: id.into(),
                title: title.into(),
                authors: vec!["Someone".into()],
                abstract_text: abs.into(),
                venue: None,
                year: Some(2020),
                doi: None,
                url: None,
            });
        }

        let config = RagConfig { min_score: -10.0, ..Default::default() };
        let result = suggest_citations(
            &claim("c0", "Our transformer attention model achieves superior accuracy."),
            Some(&corpus),
            &NoopReranker,
            &config,
        );

        assert!(!result.is_empty());
        assert!(result.len() <= config.top_k);
        // Dedupe holds.
        let ids: HashSet<&str> = result.iter().map(|c| c.doc_id.as_str()).collect();
        assert_eq!(ids.len(), result.len());
        // Per-source normalised scores survive fusion instead of being
        // flattened into the final value.
        assert!(result.iter().any(|c| c.score_sparse != 0.0));
        assert!(result.iter().any(|c| c.score_dense != 0.0));
        for candidate in &result {
            let expected = 0.5 * candidate.score_sparse + 0.5 * candidate.score_dense;
            assert!((candidate.score_final - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_min_score_threshold_filters() {
        let mut corpus = CitationCorpus::new(Arc::new(HashingEmbedder::default()));
        corpus.add_document(CorpusDocument {
            id: "d1".into(),
            title: "Unrelated gardening notes".into(),
            authors: vec![],
            abstract_text: "soil and flowers".into(),
            venue: None,
            year: None,
            doi: None,
            url: None,
        });

        let config = RagConfig { min_score: f32::MAX, ..Default::default() };
        let result = suggest_citations(
            &claim("c0", "Our transformer achieves superior accuracy."),
            Some(&corpus),
            &NoopReranker,
            &config,
        );
        assert!(result.is_empty());
    }
}
