// src/handlers/mod.rs
pub mod modes;
pub mod ui;

use crate::middleware::logging::request_logging_middleware;
use crate::state::SharedState;
use axum::{Extension, Router};
use tower_http::cors::CorsLayer;

/// The full application router with logging, CORS and shared state attached.
pub fn app_router(state: SharedState) -> Router {
    Router::new()
        .merge(ui::ui_routes())
        .merge(modes::mode_routes(state.config.max_upload_bytes))
        .layer(axum::middleware::from_fn(request_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}
