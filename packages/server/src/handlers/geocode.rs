use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GeocodeQuery {
    /// Free-text address to resolve.
    pub address: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct GeocodeResponse {
    #[schema(example = "123 Main St, Melbourne, FL 32901, USA")]
    pub formatted_address: String,
    #[schema(example = 28.0836)]
    pub lat: f64,
    pub lon: f64,
    #[schema(example = "BREVARD")]
    pub county: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/geocode",
    tag = "Geocoding",
    operation_id = "geocodeAddress",
    summary = "Resolve an address",
    description = "Geocodes an address and locates its county without storing anything.",
    params(GeocodeQuery),
    responses(
        (status = 200, description = "Address resolved", body = GeocodeResponse),
        (status = 400, description = "Empty address (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Address could not be resolved (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, query))]
pub async fn geocode_address(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<GeocodeQuery>,
) -> Result<Json<GeocodeResponse>, AppError> {
    let address = query.address.trim();
    if address.is_empty() {
        return Err(AppError::Validation("Address must not be empty".into()));
    }

    let found = state
        .enrichment
        .resolve(address)
        .await
        .into_option()
        .ok_or_else(|| AppError::NotFound("Address could not be resolved".into()))?;

    Ok(Json(GeocodeResponse {
        county: state.enrichment.locate(found.lat, found.lon),
        formatted_address: found.formatted_address,
        lat: found.lat,
        lon: found.lon,
    }))
}
