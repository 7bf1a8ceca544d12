//! Review processor
//!
//! Loads the review, performs the guarded `pending -> processing`
//! transition, runs the pipeline DAG, persists every populated slot
//! together with the terminal status, and records review metrics.

use crate::pipeline::ReviewPipeline;
use crate::state::ReviewState;
use arandu_common::db::models::ReviewStatus;
use arandu_common::db::Repository;
use arandu_common::metrics::{self, ReviewMetrics};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Review processor
pub struct ReviewProcessor {
    repository: Repository,
    pipeline: ReviewPipeline,
}

impl ReviewProcessor {
    pub fn new(repository: Repository, pipeline: ReviewPipeline) -> Self {
        Self { repository, pipeline }
    }

    /// Process one review end to end.
    pub async fn process_review(&self, review_id: Uuid) -> arandu_common::errors::Result<()> {
        let review_id_str = review_id.to_string();
        info!(review_id = %review_id_str, "Processing review");

        let Some(review) = self.repository.find_review(review_id).await? else {
            error!(review_id = %review_id_str, "Review not found");
            return Ok(());
        };

        if !self.repository.try_mark_review_processing(review_id).await? {
            warn!(review_id = %review_id_str, status = %review.status, "Review not pending, skipping");
            return Ok(());
        }

        let started = std::time::Instant::now();
        let mut state = ReviewState::from_review(&review);

        let outcome = arandu_common::logging::log_step(
            Some(&review_id_str),
            "process_review",
            async {
                self.pipeline.run(&mut state).await;
                match state.status {
                    ReviewStatus::Failed => {
                        Err(state.error_message.clone().unwrap_or_else(|| "Review failed".into()))
                    }
                    _ => Ok::<_, String>(()),
                }
            },
        )
        .await;

        let terminal_status = match &outcome {
            Ok(()) => ReviewStatus::Completed,
            Err(_) => ReviewStatus::Failed,
        };

        self.repository
            .finish_review(
                review_id,
                terminal_status,
                state.error_message.clone(),
                state.to_outputs(),
            )
            .await?;

        metrics::record_review(&ReviewMetrics {
            review_id: review_id_str.clone(),
            num_claims: state.claims.as_ref().map(|c| c.len()).unwrap_or(0),
            citation_coverage: state.citation_coverage(),
            checklist_pass_rate: state.checklist.as_ref().map(|c| c.pct_ok()).unwrap_or(0.0),
            total_time_seconds: started.elapsed().as_secs_f64(),
            had_errors: !state.errors.is_empty() || outcome.is_err(),
        });

        arandu_common::logging::log_event(
            if outcome.is_ok() { tracing::Level::INFO } else { tracing::Level::ERROR },
            "Review processing finished",
            Some(&review_id_str),
            Some("process_review"),
            Some("review_processing_finished"),
            Some(terminal_status.as_str()),
        );

        Ok(())
    }
}
