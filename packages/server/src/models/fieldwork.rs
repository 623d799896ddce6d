use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use common::duration::{parse_clock_time, parse_work_date};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::shared::{double_option, validate_link, validate_optional};

/// Request body for logging a crew visit.
///
/// `total_time` is computed from the date and times and cannot be sent.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateFieldWorkRequest {
    #[schema(example = "2024-01-01")]
    pub work_date: String,
    /// `HH:MM` or `HH:MM:SS`.
    #[schema(example = "08:00")]
    pub start_time: String,
    /// Same day as `start_time`, not earlier.
    #[schema(example = "17:30")]
    pub end_time: String,
    #[schema(example = "Crew 2")]
    pub crew: Option<String>,
    pub drone_card: Option<String>,
    pub notes: Option<String>,
    pub document_url: Option<String>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateFieldWorkRequest {
    pub work_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub crew: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub drone_card: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub document_url: Option<Option<String>>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FieldWorkResponse {
    pub id: i32,
    pub job_id: i32,
    #[schema(example = "2024-01-01")]
    pub work_date: NaiveDate,
    #[schema(example = "08:00")]
    pub start_time: String,
    #[schema(example = "17:30")]
    pub end_time: String,
    /// Hours, 2 dp.
    #[schema(example = 9.5)]
    pub total_time: f64,
    pub crew: Option<String>,
    pub drone_card: Option<String>,
    pub notes: Option<String>,
    pub document_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Parent job aggregates after a fieldwork mutation.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct JobAggregates {
    pub job_id: i32,
    #[schema(example = 2)]
    pub visited: i32,
    #[schema(example = 3.0)]
    pub total_time_spent: f64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FieldWorkMutationResponse {
    pub fieldwork: FieldWorkResponse,
    pub job: JobAggregates,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FieldWorkListResponse {
    pub data: Vec<FieldWorkResponse>,
    pub job: JobAggregates,
}

impl From<crate::entity::field_work::Model> for FieldWorkResponse {
    fn from(m: crate::entity::field_work::Model) -> Self {
        Self {
            id: m.id,
            job_id: m.job_id,
            work_date: m.work_date,
            start_time: format_clock_time(m.start_time),
            end_time: format_clock_time(m.end_time),
            total_time: m.total_time,
            crew: m.crew,
            drone_card: m.drone_card,
            notes: m.notes,
            document_url: m.document_url,
            created_at: m.created_at,
        }
    }
}

impl From<&crate::entity::job::Model> for JobAggregates {
    fn from(m: &crate::entity::job::Model) -> Self {
        Self {
            job_id: m.id,
            visited: m.visited,
            total_time_spent: m.total_time_spent,
        }
    }
}

/// `HH:MM`, or `HH:MM:SS` when the seconds are not zero.
pub fn format_clock_time(t: NaiveTime) -> String {
    if t.second() == 0 {
        t.format("%H:%M").to_string()
    } else {
        t.format("%H:%M:%S").to_string()
    }
}

/// Date and times of a visit, parsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisitTimes {
    pub work_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

fn validate_texts(
    crew: Option<&str>,
    drone_card: Option<&str>,
    notes: Option<&str>,
    document_url: Option<&str>,
) -> Result<(), AppError> {
    validate_optional(crew, "Crew", 256)?;
    validate_optional(drone_card, "Drone card", 256)?;
    validate_optional(notes, "Notes", 10_000)?;
    validate_link(document_url, "document_url")
}

/// Validate a create request and parse its date and times.
pub fn parse_create_fieldwork(req: &CreateFieldWorkRequest) -> Result<VisitTimes, AppError> {
    validate_texts(
        req.crew.as_deref(),
        req.drone_card.as_deref(),
        req.notes.as_deref(),
        req.document_url.as_deref(),
    )?;
    Ok(VisitTimes {
        work_date: parse_work_date(&req.work_date)?,
        start_time: parse_clock_time(&req.start_time)?,
        end_time: parse_clock_time(&req.end_time)?,
    })
}

/// Validate an update request and merge its date and times over `current`.
pub fn parse_update_fieldwork(
    req: &UpdateFieldWorkRequest,
    current: VisitTimes,
) -> Result<VisitTimes, AppError> {
    validate_texts(
        req.crew.clone().flatten().as_deref(),
        req.drone_card.clone().flatten().as_deref(),
        req.notes.clone().flatten().as_deref(),
        req.document_url.clone().flatten().as_deref(),
    )?;
    Ok(VisitTimes {
        work_date: match req.work_date {
            Some(ref d) => parse_work_date(d)?,
            None => current.work_date,
        },
        start_time: match req.start_time {
            Some(ref t) => parse_clock_time(t)?,
            None => current.start_time,
        },
        end_time: match req.end_time {
            Some(ref t) => parse_clock_time(t)?,
            None => current.end_time,
        },
    })
}

impl UpdateFieldWorkRequest {
    /// Whether the date or either time is being changed.
    pub fn touches_times(&self) -> bool {
        self.work_date.is_some() || self.start_time.is_some() || self.end_time.is_some()
    }
}
