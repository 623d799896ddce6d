use common::JobStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A survey engagement.
///
/// `job_number` is only unique among rows where `deleted_at IS NULL`; that
/// partial index is created by `seed::ensure_indexes`, not by schema sync.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "job")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub job_number: String,
    pub client: String,
    #[sea_orm(column_type = "Text")]
    pub address: String,
    /// Decimal degrees, as text. Set together with `long` and `county`.
    pub lat: Option<String>,
    pub long: Option<String>,
    pub county: Option<String>,
    pub status: JobStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    pub property_link: Option<String>,
    pub plat_link: Option<String>,
    pub fema_link: Option<String>,
    pub document_url: Option<String>,

    /// Number of fieldwork entries. Derived.
    #[sea_orm(default_value = 0)]
    pub visited: i32,
    /// Sum of fieldwork hours, 2 dp. Derived.
    pub total_time_spent: f64,

    #[sea_orm(has_many)]
    pub field_works: HasMany<super::field_work::Entity>,

    #[sea_orm(has_many, via = "job_tag")]
    pub tags: HasMany<super::tag::Entity>,

    pub created_at: DateTimeUtc,
    pub created_by: Option<i32>,
    pub deleted_at: Option<DateTimeUtc>,
    pub deleted_by: Option<i32>,
}

impl Model {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl ActiveModelBehavior for ActiveModel {}
