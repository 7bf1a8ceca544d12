//! Review handlers: submit (multipart), status, score, artifacts

use crate::AppState;
use arandu_common::db::models::Review;
use arandu_common::errors::{AppError, Result};
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub status: String,
    pub url: Option<String>,
    pub doi: Option<String>,
    pub repo_url: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewStatusResponse {
    pub id: Uuid,
    pub status: String,
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewDetailResponse {
    pub id: Uuid,
    pub status: String,
    pub url: Option<String>,
    pub doi: Option<String>,
    pub repo_url: Option<String>,
    pub error_message: Option<String>,
    pub paper_meta: Option<serde_json::Value>,
    pub claims: Option<serde_json::Value>,
    pub citations: Option<serde_json::Value>,
    pub checklist: Option<serde_json::Value>,
    pub quality_score: Option<serde_json::Value>,
    pub badges: Option<serde_json::Value>,
    pub html_report_path: Option<String>,
    pub json_summary_path: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ReviewDetailResponse {
    fn from_review(review: Review) -> Self {
        Self {
            id: review.id,
            status: review.status,
            url: review.url,
            doi: review.doi,
            repo_url: review.repo_url,
            error_message: review.error_message,
            paper_meta: review.paper_meta,
            claims: review.claims,
            citations: review.citations,
            checklist: review.checklist,
            quality_score: review.quality_score,
            badges: review.badges,
            html_report_path: review.html_report_path,
            json_summary_path: review.json_summary_path,
            created_at: review.created_at.to_rfc3339(),
            updated_at: review.updated_at.to_rfc3339(),
        }
    }
}

/// POST /reviews (multipart: url?, doi?, repo_url?, pdf_file?)
pub async fn create_review(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ReviewResponse>)> {
    let mut url: Option<String> = None;
    let mut doi: Option<String> = None;
    let mut repo_url: Option<String> = None;
    let mut pdf_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| AppError::Validation {
        message: format!("Invalid multipart body: {e}"),
    })? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "url" => {
                url = Some(read_text_field(field).await?).filter(|s| !s.is_empty());
            }
            "doi" => {
                doi = Some(read_text_field(field).await?).filter(|s| !s.is_empty());
            }
            "repo_url" => {
                repo_url = Some(read_text_field(field).await?).filter(|s| !s.is_empty());
            }
            "pdf_file" => {
                let bytes = field.bytes().await.map_err(|e| AppError::Validation {
                    message: format!("Failed to read pdf_file: {e}"),
                })?;
                pdf_bytes = Some(bytes.to_vec());
            }
            _ => {}
        }
    }

    if url.is_none() && doi.is_none() && pdf_bytes.is_none() {
        return Err(AppError::Validation {
            message: "At least one of 'url', 'doi', or 'pdf_file' must be provided".to_string(),
        });
    }

    let pdf_file_path = match pdf_bytes {
        Some(bytes) => {
            let max = state.config.max_pdf_size_bytes();
            if bytes.len() as u64 > max {
                return Err(AppError::PayloadTooLarge { size: bytes.len() as u64, limit: max });
            }
            arandu_common::storage::validate_pdf_bytes(&bytes, max)
                .map_err(|message| AppError::Validation { message })?;

            let pdf_dir = state.config.storage.artifacts_base_path.join("reviews").join("pdfs");
            tokio::fs::create_dir_all(&pdf_dir).await?;
            let path = pdf_dir.join(format!("{}.pdf", Uuid::new_v4()));
            tokio::fs::write(&path, &bytes).await?;
            Some(path.display().to_string())
        }
        None => None,
    };

    let review = state.repository.create_review(url, doi, pdf_file_path, repo_url).await?;

    if let Err(e) = state.queue.enqueue_review(review.id).await {
        error!(review_id = %review.id, error = %e, "Failed to enqueue review");
        state
            .repository
            .fail_review(review.id, &format!("Failed to enqueue task: {e}"))
            .await?;
    }

    arandu_common::logging::log_event(
        tracing::Level::INFO,
        "Review created",
        Some(&review.id.to_string()),
        Some("create_review"),
        Some("review_created"),
        Some("pending"),
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(ReviewResponse {
            id: review.id,
            status: review.status,
            url: review.url,
            doi: review.doi,
            repo_url: review.repo_url,
            created_at: review.created_at.to_rfc3339(),
        }),
    ))
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation { message: format!("Invalid form field: {e}") })
}

/// GET /reviews/{id}
pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewDetailResponse>> {
    let review = find_review(&state, id).await?;
    Ok(Json(ReviewDetailResponse::from_review(review)))
}

/// GET /reviews/{id}/status
pub async fn get_review_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewStatusResponse>> {
    let review = find_review(&state, id).await?;
    Ok(Json(ReviewStatusResponse {
        id: review.id,
        status: review.status.clone(),
        error_message: review.error_message,
    }))
}

/// GET /reviews/{id}/score
pub async fn get_review_score(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let review = find_review(&state, id).await?;
    let score = review.quality_score.ok_or_else(|| AppError::NotFound {
        resource_type: "quality_score".to_string(),
        id: id.to_string(),
    })?;
    Ok(Json(score))
}

/// GET /reviews/{id}/artifacts/{report.html | review.json}
pub async fn get_review_artifact(
    State(state): State<AppState>,
    Path((id, artifact)): Path<(Uuid, String)>,
) -> Result<Response> {
    let review = find_review(&state, id).await?;

    let (path, content_type) = match artifact.as_str() {
        "report.html" => (review.html_report_path, "text/html; charset=utf-8"),
        "review.json" => (review.json_summary_path, "application/json"),
        other => {
            return Err(AppError::Validation {
                message: format!(
                    "Invalid artifact_type: {other}. Must be 'report.html' or 'review.json'"
                ),
            })
        }
    };

    let path = path.ok_or_else(|| AppError::NotFound {
        resource_type: "review artifact".to_string(),
        id: artifact.clone(),
    })?;

    let content = tokio::fs::read(&path).await.map_err(|_| AppError::NotFound {
        resource_type: "review artifact file".to_string(),
        id: artifact.clone(),
    })?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        content,
    )
        .into_response())
}

async fn find_review(state: &AppState, id: Uuid) -> Result<Review> {
    state
        .repository
        .find_review(id)
        .await?
        .ok_or_else(|| AppError::ReviewNotFound { id: id.to_string() })
}
