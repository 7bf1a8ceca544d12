//! Reproduction job processor
//!
//! Owns the job lifecycle: the guarded `pending -> running` pickup, the
//! clone -> detect -> build -> execute -> artifacts pipeline, the terminal
//! status transition, and cleanup of the cloned tree and the built image on
//! every exit path. The pipeline returns a typed result; the top level is a
//! single match over the failure kind.

use crate::artifacts;
use crate::cloner;
use crate::env_detector;
use crate::executor::{self, ExecutionResult};
use crate::image;
use arandu_common::config::AppConfig;
use arandu_common::db::models::{ArtifactType, Job};
use arandu_common::db::Repository;
use arandu_common::errors::WorkerError;
use bollard::Docker;
use std::path::PathBuf;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Reproduction job processor
pub struct JobProcessor {
    repository: Repository,
    config: AppConfig,
    docker: Docker,
}

struct PipelineState {
    repo_path: Option<PathBuf>,
    image_tag: Option<String>,
}

impl JobProcessor {
    pub fn new(repository: Repository, config: AppConfig, docker: Docker) -> Self {
        Self { repository, config, docker }
    }

    /// Process one job end to end. Missing or already-claimed jobs are
    /// logged and skipped.
    pub async fn process_job(&self, job_id: Uuid) -> arandu_common::errors::Result<()> {
        let job_id_str = job_id.to_string();
        info!(job_id = %job_id_str, "Processing job");

        let Some(job) = self.repository.find_job(job_id).await? else {
            error!(job_id = %job_id_str, "Job not found");
            return Ok(());
        };

        if !self.repository.try_mark_job_running(job_id).await? {
            warn!(job_id = %job_id_str, status = %job.status, "Job not pending, skipping");
            return Ok(());
        }

        let mut state = PipelineState { repo_path: None, image_tag: None };
        let result = self.run_pipeline(&job, &job_id_str, &mut state).await;

        match result {
            Ok(()) => {
                self.repository.complete_job(job_id).await?;
                arandu_common::logging::log_event(
                    tracing::Level::INFO,
                    "Job completed",
                    Some(&job_id_str),
                    Some("process_job"),
                    Some("job_completed"),
                    Some("completed"),
                );
            }
            Err(err) => {
                self.repository.fail_job(job_id, &err.to_string()).await?;
                arandu_common::logging::log_event(
                    tracing::Level::ERROR,
                    &format!("Job failed: {err}"),
                    Some(&job_id_str),
                    Some("process_job"),
                    Some(err.kind()),
                    Some("failed"),
                );
            }
        }

        // Cleanup runs on every exit path.
        if let Some(repo_path) = &state.repo_path {
            cloner::cleanup_repo(repo_path, &job_id_str).await;
        }
        if let Some(tag) = &state.image_tag {
            image::cleanup_image(&self.docker, tag, &job_id_str).await;
        }

        Ok(())
    }

    async fn run_pipeline(
        &self,
        job: &Job,
        job_id: &str,
        state: &mut PipelineState,
    ) -> Result<(), WorkerError> {
        // Clone
        let clone_target = self.config.storage.temp_repos_path.join(job_id);
        let repo_path = cloner::clone_repo(&job.repo_url, &clone_target, job_id).await?;
        state.repo_path = Some(repo_path.clone());

        // Detect environment
        let env_info = env_detector::detect_environment(&repo_path, job_id)?;
        self.repository
            .set_job_environment(job.id, env_info.to_json())
            .await
            .map_err(|e| WorkerError::Internal(e.to_string()))?;

        // Build image
        let tag = image::build_image(&self.docker, &repo_path, &env_info, &self.config.docker, job_id)
            .await?;
        state.image_tag = Some(tag.clone());

        // Execute
        let command = job
            .run_command
            .clone()
            .unwrap_or_else(|| "python --version".to_string());
        let artifacts_dir = self.config.storage.artifacts_base_path.join(job_id);
        let run_result = executor::execute_command(
            &self.docker,
            &tag,
            &command,
            &repo_path,
            &artifacts_dir,
            &self.config.docker,
            &self.config.execution,
            job_id,
            None,
        )
        .await?;

        // Run record at the moment the sandboxed process exited
        self.repository
            .create_run(
                job.id,
                run_result.exit_code,
                run_result.stdout.clone(),
                run_result.stderr.clone(),
                Some(run_result.logs_path.display().to_string()),
                run_result.started_at,
                run_result.duration_seconds,
            )
            .await
            .map_err(|e| WorkerError::Internal(e.to_string()))?;

        // Artifacts are committed before the job flips to completed, so a
        // client observing `completed` can enumerate them atomically.
        self.emit_artifacts(job, &run_result, &env_info, &artifacts_dir, job_id)
            .await?;

        Ok(())
    }

    async fn emit_artifacts(
        &self,
        job: &Job,
        run_result: &ExecutionResult,
        env_info: &env_detector::EnvironmentInfo,
        artifacts_dir: &std::path::Path,
        job_id: &str,
    ) -> Result<(), WorkerError> {
        // Artifacts only exist for runs that reached this point; the badge
        // reflects the terminal status the job is about to commit.
        let mut job_view = job.clone();
        job_view.status = arandu_common::db::models::JobStatus::Completed.as_str().to_string();

        let report_path =
            artifacts::generate_report(&job_view, run_result, env_info, artifacts_dir, job_id)?;
        self.record_artifact(job.id, ArtifactType::Report, "markdown", &report_path).await?;

        let notebook_path = artifacts::generate_notebook(&job_view, env_info, artifacts_dir, job_id)?;
        self.record_artifact(job.id, ArtifactType::Notebook, "ipynb", &notebook_path).await?;

        let badge_path =
            artifacts::generate_badge(&job_view, &self.config.api.api_base_url, artifacts_dir, job_id)?;
        self.record_artifact(job.id, ArtifactType::Badge, "markdown", &badge_path).await?;

        Ok(())
    }

    async fn record_artifact(
        &self,
        job_id: Uuid,
        artifact_type: ArtifactType,
        format: &str,
        path: &std::path::Path,
    ) -> Result<(), WorkerError> {
        let size = std::fs::metadata(path).map(|m| m.len() as i64).ok();
        self.repository
            .create_artifact(job_id, artifact_type, format, &path.display().to_string(), size)
            .await
            .map_err(|e| WorkerError::Internal(e.to_string()))?;
        Ok(())
    }
}
