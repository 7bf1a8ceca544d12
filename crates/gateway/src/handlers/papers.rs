//! Paper hosting handlers
//!
//! Creation from multipart upload or URL fetch, monotonic version
//! allocation, a metadata summary with counts, claims listing, and a
//! Range-capable PDF viewer (206/416/400 semantics).

use crate::AppState;
use arandu_common::db::models::PaperVisibility;
use arandu_common::errors::{AppError, Result};
use arandu_common::storage;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

/// POST /api/v1/papers (multipart: pdf | url, title?, repo_url?, license?, visibility?)
pub async fn create_paper(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let form = PaperForm::parse(multipart).await?;
    let pdf_bytes = form.fetch_pdf(&state).await?;

    let aid = storage::generate_aid();
    let full_path = storage::ensure_paper_version_dir(&state.config.storage.papers_base_path, &aid, 1)
        .map_err(|message| AppError::Internal { message })?;
    tokio::fs::write(&full_path, &pdf_bytes).await?;

    let visibility = form
        .visibility
        .as_deref()
        .map(PaperVisibility::from)
        .unwrap_or(PaperVisibility::Private);

    let paper = state
        .repository
        .create_paper(aid.clone(), form.title, form.repo_url, form.license, visibility)
        .await?;

    let rel_path = storage::paper_version_path(&aid, 1, "file.pdf")
        .map_err(|message| AppError::Internal { message })?;
    state
        .repository
        .create_paper_version(&paper.aid, 1, &rel_path.display().to_string(), None)
        .await?;

    let base_url = &state.config.api.api_base_url;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "aid": aid,
            "version": 1,
            "viewer_url": format!("{base_url}/api/v1/papers/{aid}/viewer"),
            "paper_url": format!("{base_url}/api/v1/papers/{aid}"),
        })),
    ))
}

/// POST /api/v1/papers/{aid}/versions
pub async fn create_paper_version(
    State(state): State<AppState>,
    Path(aid): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let paper = state
        .repository
        .find_paper_by_aid(&aid)
        .await?
        .ok_or_else(|| AppError::PaperNotFound { id: aid.clone() })?;

    let form = PaperForm::parse(multipart).await?;
    let pdf_bytes = form.fetch_pdf(&state).await?;

    let new_version = state.repository.next_version_number(&aid).await?;

    let full_path =
        storage::ensure_paper_version_dir(&state.config.storage.papers_base_path, &aid, new_version)
            .map_err(|message| AppError::Internal { message })?;
    tokio::fs::write(&full_path, &pdf_bytes).await?;

    let rel_path = storage::paper_version_path(&aid, new_version, "file.pdf")
        .map_err(|message| AppError::Internal { message })?;
    state
        .repository
        .create_paper_version(&paper.aid, new_version, &rel_path.display().to_string(), None)
        .await?;

    let base_url = &state.config.api.api_base_url;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "aid": aid,
            "version": new_version,
            "viewer_url": format!("{base_url}/api/v1/papers/{aid}/viewer?v={new_version}"),
        })),
    ))
}

/// GET /api/v1/papers/{aid}
pub async fn get_paper(
    State(state): State<AppState>,
    Path(aid): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let paper = state
        .repository
        .find_paper_by_aid(&aid)
        .await?
        .ok_or_else(|| AppError::PaperNotFound { id: aid.clone() })?;

    let latest_version = state.repository.find_version(&aid, None).await?;
    let claims_count = state.repository.count_claims(&aid).await?;
    let scores_count = state.repository.count_scores(paper.id, &aid).await?;
    let versions_count = state.repository.count_versions(&aid).await?;
    let latest_score = state.repository.latest_score(paper.id, &aid).await?;

    Ok(Json(serde_json::json!({
        "aid": paper.aid,
        "title": paper.title,
        "visibility": paper.visibility,
        "latest_version": latest_version.map(|v| v.version),
        "approved_public": paper.approved_public_at.is_some(),
        "approved_public_at": paper.approved_public_at.map(|t| t.to_rfc3339()),
        "latest_score": latest_score.map(|s| s.score),
        "counts": {
            "claims": claims_count,
            "scores": scores_count,
            "versions": versions_count,
        },
    })))
}

#[derive(Debug, Deserialize)]
pub struct ViewerQuery {
    pub v: Option<i32>,
}

/// GET /api/v1/papers/{aid}/viewer[?v=N] with Range support
pub async fn get_paper_viewer(
    State(state): State<AppState>,
    Path(aid): Path<String>,
    Query(query): Query<ViewerQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    let full_path = resolve_pdf_path(&state, &aid, query.v).await?;
    let file_size = tokio::fs::metadata(&full_path)
        .await
        .map_err(|_| AppError::NotFound {
            resource_type: "PDF file".to_string(),
            id: aid.clone(),
        })?
        .len();

    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());

    match range_header {
        Some(range) => {
            let (start, end) = parse_range(range, file_size)?;
            let content = read_range(&full_path, start, end).await?;

            let response = (
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_TYPE, "application/pdf".to_string()),
                    (header::CONTENT_RANGE, format!("bytes {start}-{end}/{file_size}")),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                    (header::CONTENT_LENGTH, content.len().to_string()),
                ],
                content,
            );
            Ok(response.into_response())
        }
        None => {
            let content = tokio::fs::read(&full_path).await?;
            let response = (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/pdf".to_string()),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                    (header::CONTENT_LENGTH, content.len().to_string()),
                ],
                content,
            );
            Ok(response.into_response())
        }
    }
}

/// HEAD /api/v1/papers/{aid}/viewer[?v=N]
pub async fn head_paper_viewer(
    State(state): State<AppState>,
    Path(aid): Path<String>,
    Query(query): Query<ViewerQuery>,
) -> Result<Response> {
    let full_path = resolve_pdf_path(&state, &aid, query.v).await?;
    let file_size = tokio::fs::metadata(&full_path)
        .await
        .map_err(|_| AppError::NotFound {
            resource_type: "PDF file".to_string(),
            id: aid.clone(),
        })?
        .len();

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::ACCEPT_RANGES, "bytes".to_string()),
            (header::CONTENT_LENGTH, file_size.to_string()),
        ],
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct ClaimsQuery {
    pub version: Option<i32>,
    pub section: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// GET /api/v1/papers/{aid}/claims?version=&section=&limit=&offset=
pub async fn list_paper_claims(
    State(state): State<AppState>,
    Path(aid): Path<String>,
    Query(query): Query<ClaimsQuery>,
) -> Result<Json<serde_json::Value>> {
    state
        .repository
        .find_paper_by_aid(&aid)
        .await?
        .ok_or_else(|| AppError::PaperNotFound { id: aid.clone() })?;

    let limit = query.limit.unwrap_or(50).min(500);
    let offset = query.offset.unwrap_or(0);

    let claims = state
        .repository
        .list_claims(&aid, query.version, query.section.as_deref(), limit, offset)
        .await?;

    let items: Vec<serde_json::Value> = claims
        .into_iter()
        .map(|claim| {
            serde_json::json!({
                "id": claim.id,
                "text": claim.text,
                "section": claim.section,
                "span_start": claim.span_start,
                "span_end": claim.span_end,
                "confidence": claim.confidence,
                "created_at": claim.created_at.to_rfc3339(),
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "aid": aid,
        "count": items.len(),
        "limit": limit,
        "offset": offset,
        "claims": items,
    })))
}

// ============================================================================
// Helpers
// ============================================================================

struct PaperForm {
    pdf_bytes: Option<Vec<u8>>,
    url: Option<String>,
    title: Option<String>,
    repo_url: Option<String>,
    license: Option<String>,
    visibility: Option<String>,
}

impl PaperForm {
    async fn parse(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self {
            pdf_bytes: None,
            url: None,
            title: None,
            repo_url: None,
            license: None,
            visibility: None,
        };

        while let Some(field) = multipart.next_field().await.map_err(|e| AppError::Validation {
            message: format!("Invalid multipart body: {e}"),
        })? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "pdf" => {
                    let bytes = field.bytes().await.map_err(|e| AppError::Validation {
                        message: format!("Failed to read pdf: {e}"),
                    })?;
                    form.pdf_bytes = Some(bytes.to_vec());
                }
                "url" => form.url = Some(text(field).await?).filter(|s| !s.is_empty()),
                "title" => form.title = Some(text(field).await?).filter(|s| !s.is_empty()),
                "repo_url" => form.repo_url = Some(text(field).await?).filter(|s| !s.is_empty()),
                "license" => form.license = Some(text(field).await?).filter(|s| !s.is_empty()),
                "visibility" => {
                    form.visibility = Some(text(field).await?).filter(|s| !s.is_empty())
                }
                _ => {}
            }
        }

        if form.pdf_bytes.is_none() && form.url.is_none() {
            return Err(AppError::Validation {
                message: "Either 'pdf' or 'url' must be provided".to_string(),
            });
        }
        if form.pdf_bytes.is_some() && form.url.is_some() {
            return Err(AppError::Validation {
                message: "Provide either 'pdf' or 'url', not both".to_string(),
            });
        }

        Ok(form)
    }

    /// Return validated PDF bytes, fetching from the URL when needed.
    async fn fetch_pdf(&self, state: &AppState) -> Result<Vec<u8>> {
        let max = state.config.max_pdf_size_bytes();

        let bytes = match (&self.pdf_bytes, &self.url) {
            (Some(bytes), _) => bytes.clone(),
            (None, Some(url)) => {
                let client = reqwest::Client::builder()
                    .timeout(Duration::from_secs(30))
                    .build()
                    .map_err(AppError::HttpClient)?;
                let response = client
                    .get(url)
                    .send()
                    .await
                    .map_err(AppError::HttpClient)?
                    .error_for_status()
                    .map_err(AppError::HttpClient)?;
                response.bytes().await.map_err(AppError::HttpClient)?.to_vec()
            }
            (None, None) => unreachable!("validated in parse"),
        };

        if bytes.len() as u64 > max {
            return Err(AppError::PayloadTooLarge { size: bytes.len() as u64, limit: max });
        }
        storage::validate_pdf_bytes(&bytes, max)
            .map_err(|message| AppError::Validation { message: format!("Invalid PDF: {message}") })?;

        Ok(bytes)
    }
}

async fn text(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation { message: format!("Invalid form field: {e}") })
}

async fn resolve_pdf_path(
    state: &AppState,
    aid: &str,
    version: Option<i32>,
) -> Result<std::path::PathBuf> {
    state
        .repository
        .find_paper_by_aid(aid)
        .await?
        .ok_or_else(|| AppError::PaperNotFound { id: aid.to_string() })?;

    let version = state
        .repository
        .find_version(aid, version)
        .await?
        .ok_or_else(|| AppError::NotFound {
            resource_type: "paper version".to_string(),
            id: aid.to_string(),
        })?;

    Ok(state.config.storage.papers_base_path.join(&version.pdf_path))
}

async fn read_range(path: &std::path::Path, start: u64, end: u64) -> Result<Vec<u8>> {
    use tokio::io::{AsyncReadExt, AsyncSeekExt};

    let mut file = tokio::fs::File::open(path).await?;
    file.seek(std::io::SeekFrom::Start(start)).await?;
    let mut buffer = vec![0u8; (end - start + 1) as usize];
    file.read_exact(&mut buffer).await?;
    Ok(buffer)
}

/// Parse an HTTP Range header against a file size.
///
/// Supports `bytes=a-b`, `bytes=a-`, and the suffix form `bytes=-n`.
/// Malformed headers map to 400, unsatisfiable ranges to 416.
fn parse_range(header: &str, file_size: u64) -> Result<(u64, u64)> {
    let spec = header.strip_prefix("bytes=").ok_or_else(|| AppError::InvalidFormat {
        message: format!("Invalid Range header format: {header}"),
    })?;

    let (start_str, end_str) = spec.split_once('-').ok_or_else(|| AppError::InvalidFormat {
        message: format!("Invalid Range header format: {header}"),
    })?;

    let parse = |s: &str| -> Result<u64> {
        s.parse().map_err(|_| AppError::InvalidFormat {
            message: format!("Invalid Range header: non-numeric values: {header}"),
        })
    };

    let (start, end) = match (start_str.is_empty(), end_str.is_empty()) {
        // bytes=-n : final n bytes
        (true, false) => {
            let suffix = parse(end_str)?;
            if suffix == 0 || file_size == 0 {
                return Err(AppError::RangeNotSatisfiable);
            }
            let start = file_size.saturating_sub(suffix);
            (start, file_size - 1)
        }
        // bytes=a-
        (false, true) => (parse(start_str)?, file_size.saturating_sub(1)),
        // bytes=a-b
        (false, false) => (parse(start_str)?, parse(end_str)?),
        (true, true) => {
            return Err(AppError::InvalidFormat {
                message: format!("Invalid Range header format: {header}"),
            })
        }
    };

    if start >= file_size || end >= file_size || start > end {
        return Err(AppError::RangeNotSatisfiable);
    }

    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_open_range() {
        assert_eq!(parse_range("bytes=0-", 1000).unwrap(), (0, 999));
    }

    #[test]
    fn test_bounded_range() {
        assert_eq!(parse_range("bytes=10-19", 1000).unwrap(), (10, 19));
    }

    #[test]
    fn test_suffix_range() {
        assert_eq!(parse_range("bytes=-100", 1000).unwrap(), (900, 999));
        // Suffix longer than the file clamps to the whole file.
        assert_eq!(parse_range("bytes=-5000", 1000).unwrap(), (0, 999));
    }

    #[test]
    fn test_out_of_range_is_416() {
        let err = parse_range("bytes=1000-2000", 1000).unwrap_err();
        assert!(matches!(err, AppError::RangeNotSatisfiable));

        let err = parse_range("bytes=500-400", 1000).unwrap_err();
        assert!(matches!(err, AppError::RangeNotSatisfiable));
    }

    #[test]
    fn test_malformed_is_400() {
        for header in ["bites=0-10", "bytes=abc-def", "bytes=", "0-10", "bytes=-"] {
            let err = parse_range(header, 1000).unwrap_err();
            assert!(
                !matches!(err, AppError::RangeNotSatisfiable),
                "{header} should be malformed, not unsatisfiable"
            );
        }
    }
}
