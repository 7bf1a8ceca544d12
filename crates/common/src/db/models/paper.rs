//! Paper entity: hostable artifact with versions, external ids, and scores

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Paper visibility enum - FROZEN VALUES
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperVisibility {
    Private,
    Unlisted,
    Public,
}

impl PaperVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperVisibility::Private => "private",
            PaperVisibility::Unlisted => "unlisted",
            PaperVisibility::Public => "public",
        }
    }
}

impl From<&str> for PaperVisibility {
    fn from(s: &str) -> Self {
        match s {
            "unlisted" => PaperVisibility::Unlisted,
            "public" => PaperVisibility::Public,
            _ => PaperVisibility::Private,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Stable URL-safe identifier assigned at creation
    #[sea_orm(unique)]
    pub aid: String,

    pub title: Option<String>,

    pub repo_url: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub visibility: String,

    pub license: Option<String>,

    /// Stub until auth lands
    pub created_by: Option<String>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub approved_public_at: Option<DateTimeWithTimeZone>,

    /// Soft-delete tombstone
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    pub fn paper_visibility(&self) -> PaperVisibility {
        PaperVisibility::from(self.visibility.as_str())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::paper_version::Entity")]
    PaperVersion,

    #[sea_orm(has_many = "super::paper_external_id::Entity")]
    PaperExternalId,
}

impl Related<super::paper_version::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaperVersion.def()
    }
}

impl Related<super::paper_external_id::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaperExternalId.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
