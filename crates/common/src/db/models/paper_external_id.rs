//! Paper external identifier entity: at most one of each kind per paper

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// External ID kind enum - FROZEN VALUES
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalIdKind {
    Doi,
    Arxiv,
    Pmid,
    Url,
}

impl ExternalIdKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalIdKind::Doi => "doi",
            ExternalIdKind::Arxiv => "arxiv",
            ExternalIdKind::Pmid => "pmid",
            ExternalIdKind::Url => "url",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "paper_external_ids")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub paper_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub kind: String,

    pub value: String,

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
}

impl Related<super::paper::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Paper.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
