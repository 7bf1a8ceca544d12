//! Paper version entity
//!
//! Immutable once written except for the soft-delete tombstone.
//! `(aid, version)` is unique and `version >= 1` is enforced in the schema.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "paper_versions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub aid: String,

    pub version: i32,

    /// Relative to the papers base: papers/<aid>/v<version>/file.pdf
    pub pdf_path: String,

    pub meta_json: Option<Json>,

    pub created_at: DateTimeWithTimeZone,

    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::paper::Entity",
        from = "Column::Aid",
        to = "super::paper::Column::Aid"
    )]
    Paper,

    #[sea_orm(has_many = "super::claim::Entity")]
    Claim,
}

impl Related<super::paper::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Paper.def()
    }
}

impl Related<super::claim::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Claim.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
