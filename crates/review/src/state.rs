//! Review pipeline state
//!
//! A record with explicit optional result slots. Nodes return typed outputs
//! and the orchestrator merges them in; errors accumulate in a separate
//! list instead of aborting the pipeline.

use crate::badges::BadgeStatuses;
use crate::checklist::Checklist;
use crate::citations::CitationCandidate;
use crate::claims::Claim;
use crate::ingestion::PaperMeta;
use crate::quality::QualityScoreResult;
use arandu_common::db::models::{Review, ReviewStatus};
use arandu_common::db::repository::ReviewOutputs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A per-node error record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepError {
    pub step: String,
    pub message: String,
}

/// State threaded through the review DAG
#[derive(Debug, Clone)]
pub struct ReviewState {
    pub review_id: String,

    // Input modalities
    pub url: Option<String>,
    pub doi: Option<String>,
    pub pdf_file_path: Option<String>,
    pub repo_url: Option<String>,

    // Result slots, populated progressively
    pub paper_meta: Option<PaperMeta>,
    pub paper_text: String,
    pub claims: Option<Vec<Claim>>,
    pub citations: Option<HashMap<String, Vec<CitationCandidate>>>,
    pub checklist: Option<Checklist>,
    pub quality_score: Option<QualityScoreResult>,
    pub badges: Option<BadgeStatuses>,
    pub html_report_path: Option<String>,
    pub json_summary_path: Option<String>,

    pub status: ReviewStatus,
    pub error_message: Option<String>,
    pub errors: Vec<StepError>,
}

impl ReviewState {
    /// Initial state for a stored review. A previously extracted
    /// `paper_text` is carried over so ingestion can skip re-extraction.
    pub fn from_review(review: &Review) -> Self {
        Self {
            review_id: review.id.to_string(),
            url: review.url.clone(),
            doi: review.doi.clone(),
            pdf_file_path: review.pdf_file_path.clone(),
            repo_url: review.repo_url.clone(),
            paper_meta: None,
            paper_text: review.paper_text.clone().unwrap_or_default(),
            claims: None,
            citations: None,
            checklist: None,
            quality_score: None,
            badges: None,
            html_report_path: None,
            json_summary_path: None,
            status: ReviewStatus::Processing,
            error_message: None,
            errors: Vec::new(),
        }
    }

    /// Record a node failure without aborting the pipeline
    pub fn push_error(&mut self, step: &str, message: impl Into<String>) {
        self.errors.push(StepError { step: step.to_string(), message: message.into() });
    }

    /// Fraction of claims with at least one citation
    pub fn citation_coverage(&self) -> f64 {
        let Some(claims) = &self.claims else { return 0.0 };
        if claims.is_empty() {
            return 0.0;
        }
        let Some(citations) = &self.citations else { return 0.0 };
        let covered = claims
            .iter()
            .filter(|c| citations.get(&c.id).map(|v| !v.is_empty()).unwrap_or(false))
            .count();
        covered as f64 / claims.len() as f64
    }

    /// Serialize the populated slots for persistence
    pub fn to_outputs(&self) -> ReviewOutputs {
        ReviewOutputs {
            paper_meta: self.paper_meta.as_ref().and_then(|m| serde_json::to_value(m).ok()),
            paper_text: if self.paper_text.is_empty() { None } else { Some(self.paper_text.clone()) },
            claims: self.claims.as_ref().and_then(|c| serde_json::to_value(c).ok()),
            citations: self.citations.as_ref().and_then(|c| serde_json::to_value(c).ok()),
            checklist: self.checklist.as_ref().and_then(|c| serde_json::to_value(c).ok()),
            quality_score: self.quality_score.as_ref().and_then(|q| serde_json::to_value(q).ok()),
            badges: self.badges.as_ref().and_then(|b| serde_json::to_value(b).ok()),
            html_report_path: self.html_report_path.clone(),
            json_summary_path: self.json_summary_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::Claim;

    fn state_with_claims() -> ReviewState {
        ReviewState {
            review_id: "r1".into(),
            url: None,
            doi: None,
            pdf_file_path: None,
            repo_url: None,
            paper_meta: None,
            paper_text: String::new(),
            claims: Some(vec![
                Claim {
                    id: "c0".into(),
                    text: "We show X.".into(),
                    section: None,
                    spans: vec![],
                    confidence: 0.7,
                },
                Claim {
                    id: "c1".into(),
                    text: "We show Y.".into(),
                    section: None,
                    spans: vec![],
                    confidence: 0.7,
                },
            ]),
            citations: None,
            checklist: None,
            quality_score: None,
            badges: None,
            html_report_path: None,
            json_summary_path: None,
            status: ReviewStatus::Processing,
            error_message: None,
            errors: Vec::new(),
        }
    }

    #[test]
    fn test_coverage_without_citations_is_zero() {
        assert_eq!(state_with_claims().citation_coverage(), 0.0);
    }

    #[test]
    fn test_coverage_counts_claims_with_candidates() {
        let mut state = state_with_claims();
        let mut citations = HashMap::new();
        citations.insert(
            "c0".to_string(),
            vec![crate::citations::CitationCandidate {
                doc_id: "d1".into(),
                title: "Paper".into(),
                authors: vec![],
                venue: None,
                year: None,
                doi: None,
                url: None,
                score_sparse: 0.0,
                score_dense: 0.0,
                score_final: 0.9,
                score_rerank: 1.0,
                justification: String::new(),
            }],
        );
        citations.insert("c1".to_string(), vec![]);
        state.citations = Some(citations);

        assert!((state.citation_coverage() - 0.5).abs() < 1e-9);
    }
}
