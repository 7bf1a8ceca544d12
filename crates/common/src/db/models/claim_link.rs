//! Claim link entity: typed relationship from a claim to an external source
//!
//! Either `source_paper_id` or `source_doc_id` must be present. The paper
//! reference is weak: deleting the source paper nulls it, the link survives.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Claim relation enum - FROZEN VALUES
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimRelation {
    Equivalent,
    Complementary,
    Contradictory,
    Unclear,
}

impl ClaimRelation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimRelation::Equivalent => "equivalent",
            ClaimRelation::Complementary => "complementary",
            ClaimRelation::Contradictory => "contradictory",
            ClaimRelation::Unclear => "unclear",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "claim_links")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub claim_id: Uuid,

    pub source_paper_id: Option<Uuid>,

    /// Opaque external document identifier
    pub source_doc_id: Option<String>,

    pub source_citation: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub relation: String,

    pub confidence: f64,

    pub context_excerpt: Option<String>,

    /// Path to a trace or justification record
    pub reasoning_ref: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::claim::Entity",
        from = "Column::ClaimId",
        to = "super::claim::Column::Id"
    )]
    Claim,
}

impl Related<super::claim::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Claim.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
