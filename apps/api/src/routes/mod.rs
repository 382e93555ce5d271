pub mod health;

use axum::{extract::DefaultBodyLimit, routing::get, Router};

use crate::portrait::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/portraits",
            get(handlers::handle_list_portraits).post(handlers::handle_create_portrait),
        )
        .route("/api/v1/portraits/catalog", get(handlers::handle_catalog))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}
