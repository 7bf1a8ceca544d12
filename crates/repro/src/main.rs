//! Arandu Reproduction Worker
//!
//! Polls the default queue for job IDs and runs the reproduction pipeline:
//! 1. Clone the source repository
//! 2. Detect the build environment
//! 3. Build the sandboxed image
//! 4. Execute the user command under constraints
//! 5. Emit report/notebook/badge artifacts

use arandu_common::config::AppConfig;
use arandu_common::db::{self, Repository};
use arandu_common::queue::{Queue, JOBS_QUEUE};
use arandu_repro::processor::JobProcessor;
use arandu_repro::image::connect_docker;
use std::time::Duration;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    arandu_common::logging::init_tracing("repro-worker");

    info!("Starting Arandu Reproduction Worker v{}", arandu_common::VERSION);

    let config = AppConfig::load().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!("Connecting to database...");
    let conn = db::connect(&config.database).await?;
    let repository = Repository::new(conn);

    info!("Connecting to redis queue...");
    let queue = Queue::connect(&config.redis.url).await?;

    let docker = connect_docker(&config.docker.socket)?;
    let job_timeout = Duration::from_secs(config.execution.job_timeout_seconds);
    let processor = JobProcessor::new(repository.clone(), config, docker);

    info!("Reproduction worker ready, polling queue...");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            item = queue.pop(JOBS_QUEUE, 5.0) => {
                let item = match item {
                    Ok(Some(item)) => item,
                    Ok(None) => continue,
                    Err(e) => {
                        error!(error = %e, "Failed to receive from queue");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        continue;
                    }
                };

                // The per-item budget bounds the whole pipeline; a job that
                // exceeds it is terminal.
                match tokio::time::timeout(job_timeout, processor.process_job(item.id)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        error!(job_id = %item.id, error = %e, "Job processing error");
                    }
                    Err(_) => {
                        warn!(job_id = %item.id, "Job exceeded queue timeout");
                        let message = format!(
                            "Execution exceeded timeout of {} seconds",
                            job_timeout.as_secs()
                        );
                        if let Err(e) = repository.fail_job(item.id, &message).await {
                            error!(job_id = %item.id, error = %e, "Failed to mark timed-out job");
                        }
                    }
                }
            }
        }
    }

    info!("Reproduction worker shutting down");
    Ok(())
}
