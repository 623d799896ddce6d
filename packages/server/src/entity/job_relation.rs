use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per unordered pair of related jobs, stored with `low_id < high_id`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "job_relation")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub low_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub high_id: i32,
}

impl ActiveModelBehavior for ActiveModel {}
