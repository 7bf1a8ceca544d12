//! Badge handlers: on-demand SVG rendering from stored badge statuses

use crate::AppState;
use arandu_common::errors::{AppError, Result};
use arandu_review::badges::{generate_badge_svg, BadgeStatuses, BADGE_TYPES};
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

/// GET /badges/{review_id}/{badge_type}.svg
pub async fn get_badge(
    State(state): State<AppState>,
    Path((review_id, badge_file)): Path<(Uuid, String)>,
) -> Result<Response> {
    let badge_type = badge_file.strip_suffix(".svg").ok_or_else(|| AppError::Validation {
        message: format!("Badge file must end in .svg, got: {badge_file}"),
    })?;

    if !BADGE_TYPES.contains(&badge_type) {
        return Err(AppError::Validation {
            message: format!(
                "Invalid badge type. Must be one of: {}",
                BADGE_TYPES.join(", ")
            ),
        });
    }

    let review = state
        .repository
        .find_review(review_id)
        .await?
        .ok_or_else(|| AppError::ReviewNotFound { id: review_id.to_string() })?;

    let statuses: BadgeStatuses = review
        .badges
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or(BadgeStatuses {
            claim_mapped: false,
            method_check: arandu_review::badges::MethodCheck::Fail,
            citations_augmented: false,
        });

    let svg = generate_badge_svg(badge_type, &statuses);

    Ok((
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        svg,
    )
        .into_response())
}
