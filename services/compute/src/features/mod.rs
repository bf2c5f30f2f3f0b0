pub mod handlers;
pub mod implementations;
pub mod models;
pub mod schemas;

use crate::utilities::app_state::AppState;

use axum::{
    Router,
    routing::{delete, get},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/deployments",
            get(handlers::get_deployments).post(handlers::create_deployment),
        )
        .route(
            "/api/v1/deployments/{subdomain}",
            delete(handlers::delete_deployment),
        )
        .route("/api/v1/routes", get(handlers::get_routes))
        .route("/api/v1/health", get(handlers::health))
}
