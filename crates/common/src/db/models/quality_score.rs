//! Quality score entity
//!
//! Scoped to either a paper (aggregate) or a paper version (point-in-time):
//! exactly one of `paper_id` / `paper_version_id` is set, matching `scope`.
//! The XOR and the `[0, 100]` score range are schema-level CHECK constraints.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Quality score scope enum - FROZEN VALUES
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityScoreScope {
    Paper,
    Version,
}

impl QualityScoreScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityScoreScope::Paper => "paper",
            QualityScoreScope::Version => "version",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quality_scores")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub paper_id: Option<Uuid>,

    pub paper_version_id: Option<Uuid>,

    #[sea_orm(column_type = "Text")]
    pub scope: String,

    /// Integer in [0, 100]
    pub score: i32,

    pub signals: Json,

    pub rationale: Json,

    pub scoring_model_version: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::paper::Entity",
        from = "Column::PaperId",
        to = "super::paper::Column::Id"
    )]
    Paper,

    #[sea_orm(
        belongs_to = "super::paper_version::Entity",
        from = "Column::PaperVersionId",
        to = "super::paper_version::Column::Id"
    )]
    PaperVersion,
}

impl ActiveModelBehavior for ActiveModel {}
