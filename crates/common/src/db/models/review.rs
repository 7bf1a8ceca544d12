//! Review entity: paper-analysis pipeline state
//!
//! Result slots are JSON columns populated progressively by pipeline nodes.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Review status enum - FROZEN VALUES
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Processing => "processing",
            ReviewStatus::Completed => "completed",
            ReviewStatus::Failed => "failed",
        }
    }
}

impl From<&str> for ReviewStatus {
    fn from(s: &str) -> Self {
        match s {
            "processing" => ReviewStatus::Processing,
            "completed" => ReviewStatus::Completed,
            "failed" => ReviewStatus::Failed,
            _ => ReviewStatus::Pending,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    // Input modalities (at least one is present)
    pub url: Option<String>,
    pub doi: Option<String>,
    pub pdf_file_path: Option<String>,
    pub repo_url: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    // Result slots
    pub paper_meta: Option<Json>,

    #[sea_orm(column_type = "Text", nullable)]
    pub paper_text: Option<String>,

    pub claims: Option<Json>,
    pub citations: Option<Json>,
    pub checklist: Option<Json>,
    pub quality_score: Option<Json>,
    pub badges: Option<Json>,

    pub html_report_path: Option<String>,
    pub json_summary_path: Option<String>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub completed_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Get the review status as an enum
    pub fn review_status(&self) -> ReviewStatus {
        ReviewStatus::from(self.status.as_str())
    }

    /// Check if the review is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self.review_status(), ReviewStatus::Completed | ReviewStatus::Failed)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
