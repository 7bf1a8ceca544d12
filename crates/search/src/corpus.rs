//! Citation corpus: the search surface for citation suggestion
//!
//! Owns the BM25 index, the embedder, and per-document embeddings kept in
//! insertion order so dense indices map 1:1 onto corpus documents.
//! Effectively read-only during review processing; updates are serialised
//! by the owning process.

use crate::bm25::{Bm25Index, CorpusDocument};
use crate::embeddings::{search_dense, Embedder};
use crate::hybrid::{hybrid_search, FusedCandidate};
use std::collections::HashMap;
use std::sync::Arc;

/// Candidates fetched from each side before fusion
const CANDIDATE_POOL: usize = 50;

pub struct CitationCorpus {
    bm25: Bm25Index,
    embedder: Arc<dyn Embedder>,
    embeddings: Vec<Vec<f32>>,
}

impl CitationCorpus {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            bm25: Bm25Index::new(),
            embedder,
            embeddings: Vec::new(),
        }
    }

    /// Number of documents in the corpus
    pub fn len(&self) -> usize {
        self.bm25.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bm25.is_empty()
    }

    /// Look up a document by id
    pub fn get(&self, doc_id: &str) -> Option<&CorpusDocument> {
        self.bm25.get(doc_id)
    }

    /// Index a document in both sub-indices
    pub fn add_document(&mut self, doc: CorpusDocument) {
        self.embeddings.push(self.embedder.embed(&doc.content()));
        self.bm25.add_document(doc);
    }

    /// Run the hybrid search stage: BM25 top-50 and dense top-50, fused
    /// with z-score normalisation and weight `alpha` for BM25. Candidates
    /// keep their per-source normalised scores alongside the fused value.
    pub fn search(&self, query: &str, alpha: f32, top_k: usize) -> Vec<FusedCandidate> {
        if self.is_empty() {
            return Vec::new();
        }

        let bm25_results = self.bm25.search(query, CANDIDATE_POOL);

        let query_embedding = self.embedder.embed(query);
        let dense_results = search_dense(&query_embedding, &self.embeddings, CANDIDATE_POOL);

        let dense_to_doc_id: HashMap<usize, String> = dense_results
            .iter()
            .filter_map(|(idx, _)| self.bm25.documents().get(*idx).map(|d| (*idx, d.id.clone())))
            .collect();

        hybrid_search(&bm25_results, &dense_results, &dense_to_doc_id, alpha, top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;

    fn corpus_with_docs() -> CitationCorpus {
        let mut corpus = CitationCorpus::new(Arc::new(HashingEmbedder::default()));
        corpus.add_document(CorpusDocument {
            id: "p1".into(),
            title: "Attention is all you need".into(),
            authors: vec!["Vaswani".into()],
            abstract_text: "transformer architecture for sequence transduction".into(),
            venue: Some("NeurIPS".into()),
            year: Some(2017),
            doi: None,
            url: None,
        });
        corpus.add_document(CorpusDocument {
            id: "p2".into(),
            title: "Residual learning for image recognition".into(),
            authors: vec!["He".into()],
            abstract_text: "deep residual networks for vision".into(),
            venue: Some("CVPR".into()),
            year: Some(2016),
            doi: None,
            url: None,
        });
        corpus
    }

    #[test]
    fn test_empty_corpus_returns_nothing() {
        let corpus = CitationCorpus::new(Arc::new(HashingEmbedder::default()));
        assert!(corpus.search("transformer", 0.5, 5).is_empty());
    }

    #[test]
    fn test_search_finds_relevant_doc() {
        let corpus = corpus_with_docs();
        let results = corpus.search("transformer attention sequence", 0.5, 5);
        assert!(!results.is_empty());
        assert_eq!(results[0].doc_id, "p1");
        // The winner matched lexically, so its BM25 component is real.
        assert!(results[0].score_bm25 != 0.0);
    }
}
