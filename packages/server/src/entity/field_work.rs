use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "field_work")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub job_id: i32,
    #[sea_orm(belongs_to, from = "job_id", to = "id")]
    pub job: HasOne<super::job::Entity>,

    pub work_date: Date,
    pub start_time: Time,
    pub end_time: Time,
    /// Hours between start and end, 2 dp. Derived.
    pub total_time: f64,

    pub crew: Option<String>,
    pub drone_card: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub document_url: Option<String>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
