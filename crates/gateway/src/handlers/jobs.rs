//! Job handlers: submit, poll, lightweight status

use crate::AppState;
use arandu_common::db::models::{Artifact, Job, JobStatus};
use arandu_common::errors::{AppError, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct JobCreateRequest {
    pub repo_url: String,
    pub arxiv_id: Option<String>,
    pub run_command: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ArtifactResponse {
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub format: String,
    pub download_url: String,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub repo_url: String,
    pub arxiv_id: Option<String>,
    pub run_command: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub detected_environment: Option<serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<ArtifactResponse>>,
}

impl JobResponse {
    fn from_job(job: Job, artifacts: Option<Vec<Artifact>>) -> Self {
        let artifacts = artifacts.map(|list| {
            list.into_iter()
                .map(|a| ArtifactResponse {
                    download_url: format!("/jobs/{}/artifacts/{}", a.job_id, a.artifact_type),
                    artifact_type: a.artifact_type,
                    format: a.format,
                })
                .collect()
        });

        Self {
            id: job.id,
            repo_url: job.repo_url,
            arxiv_id: job.arxiv_id,
            run_command: job.run_command,
            status: job.status,
            error_message: job.error_message,
            detected_environment: job.detected_environment,
            created_at: job.created_at.to_rfc3339(),
            updated_at: job.updated_at.to_rfc3339(),
            artifacts,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub id: Uuid,
    pub status: String,
    pub error_message: Option<String>,
}

/// Accept `file://` (tests) and GitHub http/https/git URLs
fn is_supported_repo_url(url: &str) -> bool {
    if url.starts_with("file://") {
        return true;
    }
    let Some((scheme, rest)) = url.split_once("://") else {
        return false;
    };
    if !matches!(scheme, "http" | "https" | "git") {
        return false;
    }
    rest.split('/')
        .next()
        .map(|host| host == "github.com" || host.ends_with(".github.com"))
        .unwrap_or(false)
}

/// POST /jobs
pub async fn create_job(
    State(state): State<AppState>,
    Json(request): Json<JobCreateRequest>,
) -> Result<(StatusCode, Json<JobResponse>)> {
    if !is_supported_repo_url(&request.repo_url) {
        return Err(AppError::Validation {
            message: format!("repo_url must be a GitHub URL, got: {}", request.repo_url),
        });
    }

    let job = state
        .repository
        .create_job(request.repo_url, request.arxiv_id, request.run_command)
        .await?;

    arandu_common::logging::log_event(
        tracing::Level::INFO,
        "Job created",
        Some(&job.id.to_string()),
        Some("create_job"),
        Some("job_created"),
        Some("pending"),
    );

    if let Err(e) = state.queue.enqueue_job(job.id).await {
        error!(job_id = %job.id, error = %e, "Failed to enqueue job");
        state
            .repository
            .fail_job(job.id, &format!("Failed to enqueue job: {e}"))
            .await?;
        return Err(AppError::QueueError {
            message: format!("Failed to enqueue job {}", job.id),
        });
    }

    Ok((StatusCode::CREATED, Json(JobResponse::from_job(job, None))))
}

/// GET /jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobResponse>> {
    let job = state
        .repository
        .find_job(id)
        .await?
        .ok_or_else(|| AppError::JobNotFound { id: id.to_string() })?;

    let artifacts = if job.job_status() == JobStatus::Completed {
        Some(state.repository.list_artifacts(id).await?)
    } else {
        None
    };

    Ok(Json(JobResponse::from_job(job, artifacts)))
}

/// GET /jobs/{id}/artifacts/{report | notebook | badge}
pub async fn get_job_artifact(
    State(state): State<AppState>,
    Path((id, artifact_type)): Path<(Uuid, String)>,
) -> Result<axum::response::Response> {
    use axum::response::IntoResponse;

    state
        .repository
        .find_job(id)
        .await?
        .ok_or_else(|| AppError::JobNotFound { id: id.to_string() })?;

    let artifacts = state.repository.list_artifacts(id).await?;
    let artifact = artifacts
        .into_iter()
        .find(|a| a.artifact_type == artifact_type)
        .ok_or_else(|| AppError::NotFound {
            resource_type: "artifact".to_string(),
            id: artifact_type.clone(),
        })?;

    let content = tokio::fs::read(&artifact.content_path).await.map_err(|_| AppError::NotFound {
        resource_type: "artifact file".to_string(),
        id: artifact_type.clone(),
    })?;

    let content_type = match artifact.format.as_str() {
        "ipynb" => "application/x-ipynb+json",
        "svg" => "image/svg+xml",
        _ => "text/markdown; charset=utf-8",
    };

    Ok((
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, content_type)],
        content,
    )
        .into_response())
}

/// GET /jobs/{id}/status
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>> {
    let job = state
        .repository
        .find_job(id)
        .await?
        .ok_or_else(|| AppError::JobNotFound { id: id.to_string() })?;

    Ok(Json(JobStatusResponse {
        id: job.id,
        status: job.status.clone(),
        error_message: job.error_message,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_url_validation() {
        assert!(is_supported_repo_url("https://github.com/user/repo"));
        assert!(is_supported_repo_url("http://github.com/user/repo"));
        assert!(is_supported_repo_url("git://github.com/user/repo"));
        assert!(is_supported_repo_url("file:///tmp/test-repo"));

        assert!(!is_supported_repo_url("https://gitlab.com/user/repo"));
        assert!(!is_supported_repo_url("ftp://github.com/user/repo"));
        assert!(!is_supported_repo_url("not a url"));
    }
}
