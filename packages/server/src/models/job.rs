use chrono::{DateTime, Utc};
use common::JobStatus;
use serde::{Deserialize, Serialize};

use crate::enrichment::EnrichmentReport;
use crate::error::AppError;

pub use super::shared::Pagination;
use super::shared::{
    double_option, validate_id_list, validate_link, validate_optional, validate_required,
};
use super::tag::TagResponse;

const MAX_JOB_NUMBER_LEN: usize = 100;
const MAX_TAGS: usize = 50;
const MAX_RELATED_JOBS: usize = 100;

/// Request body for creating a job.
///
/// Derived fields (`visited`, `total_time_spent`, `lat`, `long`, `county`)
/// are not accepted.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateJobRequest {
    /// Unique among active jobs. Letters, digits and hyphens, up to 100 characters.
    #[schema(example = "24-0117")]
    pub job_number: String,
    #[schema(example = "Acme Homes")]
    pub client: String,
    /// Free-text street address. Replaced by the geocoder's formatted address when resolved.
    #[schema(example = "123 Main St, Melbourne, FL")]
    pub address: String,
    /// Defaults to `On Hold/Pending`.
    pub status: Option<JobStatus>,
    pub notes: Option<String>,
    /// Overrides the looked-up property record link.
    pub property_link: Option<String>,
    pub plat_link: Option<String>,
    pub fema_link: Option<String>,
    pub document_url: Option<String>,
    /// Ordered tag IDs.
    #[serde(default)]
    pub tag_ids: Vec<i32>,
    #[serde(default)]
    pub related_job_ids: Vec<i32>,
}

/// Partial update of a job. Absent fields are left untouched; `null` clears
/// a nullable field.
#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateJobRequest {
    pub job_number: Option<String>,
    pub client: Option<String>,
    /// A changed address is geocoded again.
    pub address: Option<String>,
    pub status: Option<JobStatus>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub property_link: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub plat_link: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub fema_link: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub document_url: Option<Option<String>>,
    /// Replaces the ordered tag list.
    pub tag_ids: Option<Vec<i32>>,
    /// Replaces the related-job set.
    pub related_job_ids: Option<Vec<i32>>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct JobResponse {
    #[schema(example = 12)]
    pub id: i32,
    #[schema(example = "24-0117")]
    pub job_number: String,
    #[schema(example = "Acme Homes")]
    pub client: String,
    #[schema(example = "123 Main St, Melbourne, FL 32901, USA")]
    pub address: String,
    #[schema(example = "28.0836")]
    pub lat: Option<String>,
    #[schema(example = "-80.6081")]
    pub long: Option<String>,
    #[schema(example = "BREVARD")]
    pub county: Option<String>,
    pub status: JobStatus,
    pub notes: Option<String>,
    pub property_link: Option<String>,
    pub plat_link: Option<String>,
    pub fema_link: Option<String>,
    pub document_url: Option<String>,
    /// Number of fieldwork entries.
    #[schema(example = 2)]
    pub visited: i32,
    /// Total logged hours, 2 dp.
    #[schema(example = 3.0)]
    pub total_time_spent: f64,
    pub tags: Vec<TagResponse>,
    pub related_job_ids: Vec<i32>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<i32>,
    /// Set when the job has been soft-deleted.
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<i32>,
}

/// Response to a job create or update.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct JobMutationResponse {
    pub job: JobResponse,
    /// Which enrichment steps succeeded. `null` when the address was not touched.
    pub enrichment: Option<EnrichmentReport>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct JobListItem {
    pub id: i32,
    pub job_number: String,
    pub client: String,
    pub address: String,
    pub county: Option<String>,
    pub status: JobStatus,
    pub visited: i32,
    pub total_time_spent: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct JobListResponse {
    pub data: Vec<JobListItem>,
    pub pagination: Pagination,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct JobListQuery {
    /// Page number (1-based). Default: 1.
    pub page: Option<u64>,
    /// Items per page (1-100). Default: 20.
    pub per_page: Option<u64>,
    /// Case-insensitive substring of job number, client or address.
    pub search: Option<String>,
    /// Case-insensitive job number substring.
    pub job_number: Option<String>,
    /// Case-insensitive client substring.
    pub client: Option<String>,
    /// Case-insensitive address substring.
    pub address: Option<String>,
    /// Exact status, e.g. `Needs Fieldwork`.
    #[param(value_type = Option<String>)]
    pub status: Option<JobStatus>,
    /// Exact county name.
    pub county: Option<String>,
    /// One of `created_at` (default), `job_number`, `client`, `total_time_spent`.
    pub sort_by: Option<String>,
    /// `asc` or `desc` (default).
    pub sort_order: Option<String>,
}

impl From<crate::entity::job::Model> for JobListItem {
    fn from(m: crate::entity::job::Model) -> Self {
        Self {
            id: m.id,
            job_number: m.job_number,
            client: m.client,
            address: m.address,
            county: m.county,
            status: m.status,
            visited: m.visited,
            total_time_spent: m.total_time_spent,
            created_at: m.created_at,
        }
    }
}

impl From<crate::jobs::JobDetail> for JobResponse {
    fn from(d: crate::jobs::JobDetail) -> Self {
        Self::new(d.job, d.tags, d.related_job_ids)
    }
}

impl JobResponse {
    pub fn new(
        m: crate::entity::job::Model,
        tags: Vec<crate::entity::tag::Model>,
        related_job_ids: Vec<i32>,
    ) -> Self {
        Self {
            id: m.id,
            job_number: m.job_number,
            client: m.client,
            address: m.address,
            lat: m.lat,
            long: m.long,
            county: m.county,
            status: m.status,
            notes: m.notes,
            property_link: m.property_link,
            plat_link: m.plat_link,
            fema_link: m.fema_link,
            document_url: m.document_url,
            visited: m.visited,
            total_time_spent: m.total_time_spent,
            tags: tags.into_iter().map(TagResponse::from).collect(),
            related_job_ids,
            created_at: m.created_at,
            created_by: m.created_by,
            deleted_at: m.deleted_at,
            deleted_by: m.deleted_by,
        }
    }
}

pub fn validate_job_number(job_number: &str) -> Result<(), AppError> {
    let job_number = job_number.trim();
    if job_number.is_empty() || job_number.chars().count() > MAX_JOB_NUMBER_LEN {
        return Err(AppError::Validation(format!(
            "Job number must be 1-{MAX_JOB_NUMBER_LEN} characters"
        )));
    }
    if !job_number
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(AppError::Validation(
            "Job number may contain only letters, digits, and hyphens".into(),
        ));
    }
    Ok(())
}

fn validate_links(
    property: Option<&str>,
    plat: Option<&str>,
    fema: Option<&str>,
    document: Option<&str>,
) -> Result<(), AppError> {
    validate_link(property, "property_link")?;
    validate_link(plat, "plat_link")?;
    validate_link(fema, "fema_link")?;
    validate_link(document, "document_url")
}

pub fn validate_create_job(req: &CreateJobRequest) -> Result<(), AppError> {
    validate_job_number(&req.job_number)?;
    validate_required(&req.client, "Client", 256)?;
    validate_required(&req.address, "Address", 512)?;
    validate_optional(req.notes.as_deref(), "Notes", 10_000)?;
    validate_links(
        req.property_link.as_deref(),
        req.plat_link.as_deref(),
        req.fema_link.as_deref(),
        req.document_url.as_deref(),
    )?;
    validate_id_list(&req.tag_ids, "tag", MAX_TAGS)?;
    validate_id_list(&req.related_job_ids, "related job", MAX_RELATED_JOBS)
}

pub fn validate_update_job(req: &UpdateJobRequest) -> Result<(), AppError> {
    if let Some(ref job_number) = req.job_number {
        validate_job_number(job_number)?;
    }
    if let Some(ref client) = req.client {
        validate_required(client, "Client", 256)?;
    }
    if let Some(ref address) = req.address {
        validate_required(address, "Address", 512)?;
    }
    validate_optional(req.notes.clone().flatten().as_deref(), "Notes", 10_000)?;
    validate_links(
        req.property_link.clone().flatten().as_deref(),
        req.plat_link.clone().flatten().as_deref(),
        req.fema_link.clone().flatten().as_deref(),
        req.document_url.clone().flatten().as_deref(),
    )?;
    if let Some(ref ids) = req.tag_ids {
        validate_id_list(ids, "tag", MAX_TAGS)?;
    }
    if let Some(ref ids) = req.related_job_ids {
        validate_id_list(ids, "related job", MAX_RELATED_JOBS)?;
    }
    Ok(())
}
