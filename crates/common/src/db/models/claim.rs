//! Claim entity: a sentence-level assertion extracted from a paper version
//!
//! `hash` is the SHA-256 of `text|span_start|span_end|paper_version_id` and
//! is the dedupe key. `text_hash` fingerprints the base document used for
//! span extraction so drift against the current document can be detected.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "claims")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub paper_version_id: Uuid,

    /// Denormalised for fast joins
    pub paper_id: Option<Uuid>,

    #[sea_orm(column_type = "Text")]
    pub text: String,

    /// Inclusive start of the half-open span [start, end)
    pub span_start: Option<i32>,

    /// Exclusive end of the half-open span [start, end)
    pub span_end: Option<i32>,

    pub page: Option<i32>,

    /// Bounding box {x, y, width, height}
    pub bbox: Option<Json>,

    pub section: Option<String>,

    pub confidence: Option<f64>,

    pub extraction_model_version: Option<String>,

    /// Dedupe key
    #[sea_orm(unique)]
    pub hash: String,

    pub text_hash: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Compute the dedupe hash for a claim's identifying fields.
    pub fn compute_hash(
        text: &str,
        span_start: Option<i32>,
        span_end: Option<i32>,
        paper_version_id: Uuid,
    ) -> String {
        let start = span_start.map(|v| v.to_string()).unwrap_or_default();
        let end = span_end.map(|v| v.to_string()).unwrap_or_default();
        let payload = format!("{text}|{start}|{end}|{paper_version_id}");
        hex::encode(Sha256::digest(payload.as_bytes()))
    }

    /// Fingerprint of the base document used for span extraction.
    pub fn compute_text_hash(document: &str) -> String {
        hex::encode(Sha256::digest(document.as_bytes()))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::paper_version::Entity",
        from = "Column::PaperVersionId",
        to = "super::paper_version::Column::Id"
    )]
    PaperVersion,

    #[sea_orm(has_many = "super::claim_link::Entity")]
    ClaimLink,
}

impl Related<super::paper_version::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaperVersion.def()
    }
}

impl Related<super::claim_link::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClaimLink.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_distinguishes_spans() {
        let vid = Uuid::new_v4();
        let with_span = Model::compute_hash("We show X.", Some(0), Some(10), vid);
        let without_span = Model::compute_hash("We show X.", None, None, vid);
        assert_ne!(with_span, without_span);
        assert_eq!(with_span.len(), 64);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let vid = Uuid::new_v4();
        let a = Model::compute_hash("text", Some(1), Some(2), vid);
        let b = Model::compute_hash("text", Some(1), Some(2), vid);
        assert_eq!(a, b);
    }
}
