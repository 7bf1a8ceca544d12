//! In-memory BM25 index
//!
//! Okapi BM25 over a small citation corpus. Documents carry the usual
//! bibliographic fields; the searchable content is title + abstract.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A document in the citation corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusDocument {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: String,
    pub venue: Option<String>,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub url: Option<String>,
}

impl CorpusDocument {
    /// Searchable content: title + abstract
    pub fn content(&self) -> String {
        format!("{} {}", self.title, self.abstract_text)
    }
}

#[derive(Debug, Default)]
struct IndexedDoc {
    term_freqs: HashMap<String, u32>,
    len: usize,
}

/// BM25 index with `add_document` / `search`
#[derive(Debug, Default)]
pub struct Bm25Index {
    docs: Vec<CorpusDocument>,
    indexed: Vec<IndexedDoc>,
    doc_freqs: HashMap<String, u32>,
    total_len: usize,
    k1: f32,
    b: f32,
}

impl Bm25Index {
    pub fn new() -> Self {
        Self {
            docs: Vec::new(),
            indexed: Vec::new(),
            doc_freqs: HashMap::new(),
            total_len: 0,
            k1: 1.5,
            b: 0.75,
        }
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// All documents, in insertion order (the dense index shares this order)
    pub fn documents(&self) -> &[CorpusDocument] {
        &self.docs
    }

    /// Look up a document by ID
    pub fn get(&self, doc_id: &str) -> Option<&CorpusDocument> {
        self.docs.iter().find(|d| d.id == doc_id)
    }

    /// Add a document to the index
    pub fn add_document(&mut self, doc: CorpusDocument) {
        let tokens = tokenize(&doc.content());
        let mut term_freqs: HashMap<String, u32> = HashMap::new();
        for token in &tokens {
            *term_freqs.entry(token.clone()).or_insert(0) += 1;
        }
        for term in term_freqs.keys() {
            *self.doc_freqs.entry(term.clone()).or_insert(0) += 1;
        }
        self.total_len += tokens.len();
        self.indexed.push(IndexedDoc { term_freqs, len: tokens.len() });
        self.docs.push(doc);
    }

    /// Search the index, returning `(doc_id, score)` sorted by score
    /// descending. Documents with no overlapping term are omitted.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<(String, f32)> {
        if self.docs.is_empty() {
            return Vec::new();
        }

        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let n = self.docs.len() as f32;
        let avgdl = self.total_len as f32 / n;

        let mut scored: Vec<(String, f32)> = Vec::new();
        for (doc, indexed) in self.docs.iter().zip(&self.indexed) {
            let mut score = 0.0f32;
            for term in &query_terms {
                let Some(&tf) = indexed.term_freqs.get(term) else {
                    continue;
                };
                let df = *self.doc_freqs.get(term).unwrap_or(&0) as f32;
                let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
                let tf = tf as f32;
                let denom = tf + self.k1 * (1.0 - self.b + self.b * indexed.len as f32 / avgdl);
                score += idf * tf * (self.k1 + 1.0) / denom;
            }
            if score > 0.0 {
                scored.push((doc.id.clone(), score));
            }
        }

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }
}

/// Lowercased alphanumeric tokens, terms shorter than 2 chars dropped
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2)
        .map(|t| t.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, title: &str, abstract_text: &str) -> CorpusDocument {
        CorpusDocument {
            id: id.to_string(),
            title: title.to_string(),
            authors: vec!["A. Author".to_string()],
            abstract_text: abstract_text.to_string(),
            venue: None,
            year: Some(2023),
            doi: None,
            url: None,
        }
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = Bm25Index::new();
        assert!(index.search("anything", 10).is_empty());
    }

    #[test]
    fn test_relevant_document_ranks_first() {
        let mut index = Bm25Index::new();
        index.add_document(doc("a", "Deep learning for images", "convolutional networks"));
        index.add_document(doc("b", "Reinforcement learning agents", "policy gradients"));
        index.add_document(doc("c", "Bird migration patterns", "seasonal observation data"));

        let results = index.search("convolutional deep learning", 10);
        assert!(!results.is_empty());
        assert_eq!(results[0].0, "a");
    }

    #[test]
    fn test_top_k_truncation() {
        let mut index = Bm25Index::new();
        for i in 0..20 {
            index.add_document(doc(&format!("d{i}"), "transformer attention", "self attention layers"));
        }
        let results = index.search("attention", 5);
        assert_eq!(results.len(), 5);
    }

    #[test]
    fn test_no_overlap_no_result() {
        let mut index = Bm25Index::new();
        index.add_document(doc("a", "Graphs", "spectral clustering"));
        assert!(index.search("zebra quantum", 10).is_empty());
    }
}
