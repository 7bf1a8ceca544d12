//! Review pipeline orchestrator
//!
//! Runs the DAG in dependency order:
//!
//! ```text
//! ingestion -> claim_extraction -> { citation_suggestion, checklist_generation }
//!                               -> quality_score -> badge_generation -> report_generation
//! ```
//!
//! Each node reads a snapshot of the upstream slots and returns a typed
//! output that the orchestrator merges into the state. Node failures are
//! recorded in the error list; the review only fails when a node's required
//! inputs are unusable (no paper text) or when report emission fails.

use crate::badges::compute_badges;
use crate::checklist::generate_checklist;
use crate::citations::suggest_citations_for_claims;
use crate::claims::extract_claims_by_section;
use crate::ingestion::ingest_paper;
use crate::llm::GeminiClient;
use crate::quality::predictor::predict_quality_score;
use crate::quality::{build_features, QualityScoreResult};
use crate::report::{build_review_data, generate_html_report, generate_json_report};
use crate::state::ReviewState;
use arandu_common::config::AppConfig;
use arandu_common::db::models::ReviewStatus;
use arandu_search::{CitationCorpus, NoopReranker, Reranker};
use std::path::Path;
use tracing::info;

/// Review pipeline with its collaborators
pub struct ReviewPipeline {
    config: AppConfig,
    corpus: Option<CitationCorpus>,
    reranker: Box<dyn Reranker>,
    llm: Option<GeminiClient>,
}

impl ReviewPipeline {
    pub fn new(config: AppConfig) -> Self {
        let llm = GeminiClient::from_config(&config.llm);
        Self {
            config,
            corpus: None,
            reranker: Box::new(NoopReranker),
            llm,
        }
    }

    /// Attach an external citation corpus
    pub fn with_corpus(mut self, corpus: CitationCorpus) -> Self {
        self.corpus = Some(corpus);
        self
    }

    /// Swap the reranker implementation
    pub fn with_reranker(mut self, reranker: Box<dyn Reranker>) -> Self {
        self.reranker = reranker;
        self
    }

    /// Run the full DAG over the state.
    pub async fn run(&self, state: &mut ReviewState) {
        let review_id = state.review_id.clone();

        // --- ingestion ---
        if state.paper_text.is_empty() {
            let outcome = arandu_common::logging::log_step(Some(&review_id), "ingestion", async {
                ingest_paper(
                    state.url.as_deref(),
                    state.doi.as_deref(),
                    state.pdf_file_path.as_deref(),
                    &self.config.rag,
                )
                .await
            })
            .await;

            match outcome {
                Ok(ingested) => {
                    state.paper_meta = Some(ingested.meta);
                    state.paper_text = ingested.text;
                }
                Err(message) => {
                    // Nothing downstream can run without text.
                    state.push_error("ingestion", message.clone());
                    state.status = ReviewStatus::Failed;
                    state.error_message = Some(format!("Ingestion failed: {message}"));
                    return;
                }
            }
        } else {
            info!(review_id = %review_id, "Paper text pre-populated, skipping ingestion");
        }

        // --- claim extraction ---
        let claims = arandu_common::logging::log_step_sync(Some(&review_id), "claim_extraction", || {
            Ok::<_, String>(extract_claims_by_section(&state.paper_text))
        })
        .unwrap_or_default();
        info!(review_id = %review_id, count = claims.len(), "Claims extracted");
        state.claims = Some(claims);

        // --- citation suggestion ---
        let claims_snapshot = state.claims.clone().unwrap_or_default();
        let citations =
            arandu_common::logging::log_step_sync(Some(&review_id), "citation_suggestion", || {
                Ok::<_, String>(suggest_citations_for_claims(
                    &claims_snapshot,
                    self.corpus.as_ref(),
                    self.reranker.as_ref(),
                    &self.config.rag,
                ))
            })
            .unwrap_or_default();
        state.citations = Some(citations);

        // --- checklist generation ---
        let checklist =
            arandu_common::logging::log_step_sync(Some(&review_id), "checklist_generation", || {
                Ok::<_, String>(generate_checklist(&state.paper_text, None))
            })
            .unwrap_or_else(|_: String| crate::checklist::Checklist {
                items: vec![],
                summary: "Generation failed".to_string(),
            });
        info!(review_id = %review_id, summary = %checklist.summary, "Checklist generated");
        state.checklist = Some(checklist);

        // --- quality score ---
        let score_result = arandu_common::logging::log_step(Some(&review_id), "quality_score", async {
            let features = build_features(
                state.claims.as_deref().unwrap_or_default(),
                &state.paper_text,
                state.checklist.as_ref().expect("checklist populated above"),
                state.citations.as_ref(),
                None,
            );

            let prediction =
                predict_quality_score(&features, &self.config.storage.artifacts_base_path);
            let shap = crate::quality::shap::explain(&features, None);
            let narrative = crate::quality::narrator::generate_narrative(
                prediction.score,
                &prediction.tier,
                &shap,
                state.checklist.as_ref(),
                state.claims.as_deref().unwrap_or_default(),
                state.paper_meta.as_ref(),
                self.llm.as_ref(),
            )
            .await;

            Ok::<_, String>(QualityScoreResult {
                value_0_100: prediction.score,
                tier: prediction.tier,
                version: prediction.version,
                model_type: prediction.model_type,
                features: serde_json::to_value(&features).unwrap_or(serde_json::Value::Null),
                shap,
                narrative,
            })
        })
        .await;

        match score_result {
            Ok(result) => {
                info!(review_id = %review_id, score = result.value_0_100, tier = %result.tier, "Quality score computed");
                state.quality_score = Some(result);
            }
            Err(message) => state.push_error("quality_score", message),
        }

        // --- badge generation ---
        let badges = compute_badges(
            state.claims.as_deref().map(|c| c.len()).unwrap_or(0),
            state.checklist.as_ref(),
            state.citation_coverage(),
        );
        state.badges = Some(badges);

        // --- report generation ---
        let report_outcome =
            arandu_common::logging::log_step_sync(Some(&review_id), "report_generation", || {
                self.generate_reports(state)
            });

        match report_outcome {
            Ok((html_path, json_path)) => {
                state.html_report_path = Some(html_path);
                state.json_summary_path = Some(json_path);
                state.status = ReviewStatus::Completed;
            }
            Err(message) => {
                state.push_error("report_generation", message.clone());
                state.status = ReviewStatus::Failed;
                state.error_message = Some(format!("Report generation failed: {message}"));
            }
        }
    }

    fn generate_reports(&self, state: &ReviewState) -> Result<(String, String), String> {
        let reports_dir: &Path = &self.config.storage.reviews_base_path;
        let review_dir = reports_dir.join(&state.review_id);

        let review_data = build_review_data(state);
        let html_path = generate_html_report(&review_data, &review_dir.join("report.html"))?;
        let json_path = generate_json_report(&review_data, &review_dir.join("review.json"))?;

        Ok((
            html_path.display().to_string(),
            json_path.display().to_string(),
        ))
    }
}
