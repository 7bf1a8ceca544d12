//! Arandu hybrid retrieval
//!
//! Three sub-indices with uniform contracts:
//! - BM25 over a corpus of paper documents (lexical matching)
//! - Dense search over a normalised vector space (cosine similarity)
//! - An optional cross-encoder reranker with an order-preserving fallback
//!
//! Hybrid fusion combines BM25 and dense scores with per-source z-score
//! normalisation and a configurable weight.

pub mod bm25;
pub mod corpus;
pub mod embeddings;
pub mod hybrid;
pub mod rerank;

pub use bm25::{Bm25Index, CorpusDocument};
pub use corpus::CitationCorpus;
pub use embeddings::{search_dense, Embedder, HashingEmbedder};
pub use hybrid::{hybrid_search, normalize_scores, FusedCandidate};
pub use rerank::{NoopReranker, RerankCandidate, Reranker};
