//! Arandu Review Worker
//!
//! Polls the reviews queue and runs the review pipeline DAG:
//! ingestion, claim extraction, citation suggestion, checklist,
//! quality score, badges, and report generation.

use arandu_common::config::AppConfig;
use arandu_common::db::{self, Repository};
use arandu_common::queue::{Queue, REVIEWS_QUEUE};
use arandu_review::pipeline::ReviewPipeline;
use arandu_review::processor::ReviewProcessor;
use std::time::Duration;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    arandu_common::logging::init_tracing("review-worker");

    info!("Starting Arandu Review Worker v{}", arandu_common::VERSION);

    let config = AppConfig::load().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!("Connecting to database...");
    let conn = db::connect(&config.database).await?;
    let repository = Repository::new(conn);

    info!("Connecting to redis queue...");
    let queue = Queue::connect(&config.redis.url).await?;

    let review_timeout = Duration::from_secs(config.execution.review_timeout_seconds);
    let pipeline = ReviewPipeline::new(config);
    let processor = ReviewProcessor::new(repository.clone(), pipeline);

    info!("Review worker ready, polling queue...");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            item = queue.pop(REVIEWS_QUEUE, 5.0) => {
                let item = match item {
                    Ok(Some(item)) => item,
                    Ok(None) => continue,
                    Err(e) => {
                        error!(error = %e, "Failed to receive from queue");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        continue;
                    }
                };

                match tokio::time::timeout(review_timeout, processor.process_review(item.id)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        error!(review_id = %item.id, error = %e, "Review processing error");
                    }
                    Err(_) => {
                        warn!(review_id = %item.id, "Review exceeded queue timeout");
                        let message = format!(
                            "Review processing exceeded timeout of {} seconds",
                            review_timeout.as_secs()
                        );
                        if let Err(e) = repository.fail_review(item.id, &message).await {
                            error!(review_id = %item.id, error = %e, "Failed to mark timed-out review");
                        }
                    }
                }
            }
        }
    }

    info!("Review worker shutting down");
    Ok(())
}
