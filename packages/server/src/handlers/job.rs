use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::jobs::JobService;
use crate::models::job::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/jobs",
    tag = "Jobs",
    operation_id = "createJob",
    summary = "Create a job",
    description = "Creates a survey job. Requires the `admin` role. The address is geocoded, located in a county and linked to its property record before the job is stored; any of these steps may fail softly, in which case the raw address is kept and the `enrichment` report says which steps succeeded. `visited` and `total_time_spent` start at zero.",
    request_body = CreateJobRequest,
    responses(
        (status = 201, description = "Job created", body = JobMutationResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "An active job holds this number (DUPLICATE_JOB_NUMBER)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(job_number = %payload.job_number))]
pub async fn create_job(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateJobRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (detail, report) = JobService::from_state(&state)
        .create_job(&auth_user, payload)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(JobMutationResponse {
            job: detail.into(),
            enrichment: Some(report),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    tag = "Jobs",
    operation_id = "listJobs",
    summary = "List active jobs",
    description = "Returns a page of jobs that have not been deleted. Text filters are case-insensitive substring matches; `status` and `county` are exact.",
    params(JobListQuery),
    responses(
        (status = 200, description = "List of jobs", body = JobListResponse),
        (status = 400, description = "Invalid sort field (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, query))]
pub async fn list_jobs(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Result<Json<JobListResponse>, AppError> {
    let (jobs, pagination) = JobService::from_state(&state).list_jobs(&query).await?;

    Ok(Json(JobListResponse {
        data: jobs.into_iter().map(JobListItem::from).collect(),
        pagination,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}",
    tag = "Jobs",
    operation_id = "getJob",
    summary = "Get a job by ID",
    description = "Returns a job with its tags and related jobs. Deleted jobs are still returned, with `deleted_at` set.",
    params(("id" = i32, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job details", body = JobResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Job not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(id))]
pub async fn get_job(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<JobResponse>, AppError> {
    let detail = JobService::from_state(&state).get_job(id).await?;
    Ok(Json(detail.into()))
}

#[utoipa::path(
    patch,
    path = "/api/v1/jobs/{id}",
    tag = "Jobs",
    operation_id = "updateJob",
    summary = "Update a job",
    description = "Partially updates a job using PATCH semantics. Requires the `admin` role. A changed address is geocoded again: on success the address, coordinates and county are replaced together; on failure all of them are left as they were and `enrichment.geocoded` is false.",
    params(("id" = i32, Path, description = "Job ID")),
    request_body = UpdateJobRequest,
    responses(
        (status = 200, description = "Job updated", body = JobMutationResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Job not found or deleted (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "An active job holds this number (DUPLICATE_JOB_NUMBER)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_job(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateJobRequest>,
) -> Result<Json<JobMutationResponse>, AppError> {
    let (detail, report) = JobService::from_state(&state)
        .update_job(&auth_user, id, payload)
        .await?;

    Ok(Json(JobMutationResponse {
        job: detail.into(),
        enrichment: report,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/jobs/{id}",
    tag = "Jobs",
    operation_id = "deleteJob",
    summary = "Delete a job",
    description = "Soft-deletes a job. Requires the `admin` role. The job and its fieldwork stay readable by ID, and its job number may be reused.",
    params(("id" = i32, Path, description = "Job ID")),
    responses(
        (status = 204, description = "Job deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Job not found or already deleted (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_job(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    JobService::from_state(&state)
        .delete_job(&auth_user, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
