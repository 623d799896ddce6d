use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::jobs::JobService;
use crate::models::fieldwork::*;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}/fieldwork",
    tag = "Fieldwork",
    operation_id = "listJobFieldwork",
    summary = "List a job's fieldwork",
    description = "Returns every fieldwork entry of a job, oldest visit first, with the job's aggregates. Works for deleted jobs.",
    params(("id" = i32, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Fieldwork entries", body = FieldWorkListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Job not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(id))]
pub async fn list_job_fieldwork(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<FieldWorkListResponse>, AppError> {
    let (job, entries) = JobService::from_state(&state)
        .get_fieldwork_for_job(id)
        .await?;

    Ok(Json(FieldWorkListResponse {
        job: JobAggregates::from(&job),
        data: entries.into_iter().map(FieldWorkResponse::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/jobs/{id}/fieldwork",
    tag = "Fieldwork",
    operation_id = "createFieldwork",
    summary = "Log a crew visit",
    description = "Adds a fieldwork entry to an active job. Requires the `admin` role. `total_time` is computed from the date and times; an end time before the start time is rejected.",
    params(("id" = i32, Path, description = "Job ID")),
    request_body = CreateFieldWorkRequest,
    responses(
        (status = 201, description = "Fieldwork logged", body = FieldWorkMutationResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Admin role required (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Job not found or deleted (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn create_fieldwork(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<CreateFieldWorkRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (entry, job) = JobService::from_state(&state)
        .create_fieldwork(&auth_user, id, payload)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(FieldWorkMutationResponse {
            job: JobAggregates::from(&job),
            fieldwork: entry.into(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/fieldwork/{id}",
    tag = "Fieldwork",
    operation_id = "getFieldwork",
    summary = "Get a fieldwork entry",
    params(("id" = i32, Path, description = "Fieldwork entry ID")),
    responses(
        (status = 200, description = "Fieldwork entry", body = FieldWorkResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Entry not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(id))]
pub async fn get_fieldwork(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<FieldWorkResponse>, AppError> {
    let entry = JobService::from_state(&state).get_fieldwork(id).await?;
    Ok(Json(entry.into()))
}

#[utoipa::path(
    patch,
    path = "/api/v1/fieldwork/{id}",
    tag = "Fieldwork",
    operation_id = "updateFieldwork",
    summary = "Update a fieldwork entry",
    description = "Partially updates a fieldwork entry and recomputes the job's aggregates. Requires the `admin` role. Entries of deleted jobs cannot be changed.",
    params(("id" = i32, Path, description = "Fieldwork entry ID")),
    request_body = UpdateFieldWorkRequest,
    responses(
        (status = 200, description = "Fieldwork updated", body = FieldWorkMutationResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Admin role required (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Entry not found, or its job is deleted (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_fieldwork(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateFieldWorkRequest>,
) -> Result<Json<FieldWorkMutationResponse>, AppError> {
    let (entry, job) = JobService::from_state(&state)
        .update_fieldwork(&auth_user, id, payload)
        .await?;

    Ok(Json(FieldWorkMutationResponse {
        job: JobAggregates::from(&job),
        fieldwork: entry.into(),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/fieldwork/{id}",
    tag = "Fieldwork",
    operation_id = "deleteFieldwork",
    summary = "Delete a fieldwork entry",
    description = "Permanently deletes a fieldwork entry and recomputes the job's aggregates. Requires the `admin` role.",
    params(("id" = i32, Path, description = "Fieldwork entry ID")),
    responses(
        (status = 200, description = "Entry deleted; the job's new aggregates", body = JobAggregates),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Entry not found, or its job is deleted (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_fieldwork(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<JobAggregates>, AppError> {
    let job = JobService::from_state(&state)
        .delete_fieldwork(&auth_user, id)
        .await?;
    Ok(Json(JobAggregates::from(&job)))
}
