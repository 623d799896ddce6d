use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/users", user_routes())
        .nest("/tags", tag_routes())
        .nest("/jobs", job_routes())
        .nest("/fieldwork", fieldwork_routes())
        .route("/geocode", get(handlers::geocode::geocode_address))
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/me", get(handlers::auth::me))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::user::list_users).post(handlers::user::create_user),
        )
        .route("/{id}", delete(handlers::user::delete_user))
        .route("/{id}/reset-password", post(handlers::user::reset_password))
        .route("/{id}/toggle-role", post(handlers::user::toggle_role))
}

fn tag_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(handlers::tag::list_tags).post(handlers::tag::create_tag),
    )
}

fn job_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::job::list_jobs).post(handlers::job::create_job),
        )
        .route(
            "/{id}",
            get(handlers::job::get_job)
                .patch(handlers::job::update_job)
                .delete(handlers::job::delete_job),
        )
        .route(
            "/{id}/fieldwork",
            get(handlers::fieldwork::list_job_fieldwork).post(handlers::fieldwork::create_fieldwork),
        )
}

fn fieldwork_routes() -> Router<AppState> {
    Router::new().route(
        "/{id}",
        get(handlers::fieldwork::get_fieldwork)
            .patch(handlers::fieldwork::update_fieldwork)
            .delete(handlers::fieldwork::delete_fieldwork),
    )
}
