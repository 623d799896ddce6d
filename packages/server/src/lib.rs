pub mod config;
pub mod database;
pub mod enrichment;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod jobs;
pub mod models;
pub mod routes;
pub mod seed;
pub mod state;
pub mod utils;

use std::time::Duration;

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_scalar::{Scalar, Servable as ScalarServable};

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fieldbook API",
        version = "1.0.0",
        description = "Survey job tracking: jobs, geocoded addresses and crew fieldwork"
    ),
    paths(
        handlers::auth::login,
        handlers::auth::me,
        handlers::user::list_users,
        handlers::user::create_user,
        handlers::user::reset_password,
        handlers::user::toggle_role,
        handlers::user::delete_user,
        handlers::tag::list_tags,
        handlers::tag::create_tag,
        handlers::job::create_job,
        handlers::job::list_jobs,
        handlers::job::get_job,
        handlers::job::update_job,
        handlers::job::delete_job,
        handlers::fieldwork::list_job_fieldwork,
        handlers::fieldwork::create_fieldwork,
        handlers::fieldwork::get_fieldwork,
        handlers::fieldwork::update_fieldwork,
        handlers::fieldwork::delete_fieldwork,
        handlers::geocode::geocode_address,
    ),
    tags(
        (name = "Auth", description = "Login and the current user"),
        (name = "Users", description = "Operator account management"),
        (name = "Tags", description = "Job tags"),
        (name = "Jobs", description = "Survey job lifecycle"),
        (name = "Fieldwork", description = "Crew visits logged against jobs"),
        (name = "Geocoding", description = "Address resolution"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(config.max_age))
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config.server.cors);

    axum::Router::new()
        .nest("/api", routes::api_routes())
        .with_state(state)
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .layer(cors)
}
