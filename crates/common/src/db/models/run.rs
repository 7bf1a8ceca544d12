//! Run entity: the exit record of one containerised execution

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "runs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// One run per job
    #[sea_orm(unique)]
    pub job_id: Uuid,

    pub exit_code: Option<i32>,

    /// Truncated preview for display
    #[sea_orm(column_type = "Text", nullable)]
    pub stdout: Option<String>,

    /// Truncated preview for display
    #[sea_orm(column_type = "Text", nullable)]
    pub stderr: Option<String>,

    /// Absolute host path to the combined untruncated log
    pub logs_path: Option<String>,

    pub started_at: DateTimeWithTimeZone,

    pub completed_at: Option<DateTimeWithTimeZone>,

    pub duration_seconds: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::job::Entity",
        from = "Column::JobId",
        to = "super::job::Column::Id"
    )]
    Job,
}

impl Related<super::job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Job.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
