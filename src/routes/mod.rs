pub mod auth;
pub mod health;
pub mod learning;
pub mod words;

use std::path::Path;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use crate::middleware::{rate_limit, request_id};
use crate::state::AppState;

/// Maximum request body size: 256 KiB.
const MAX_BODY_SIZE: usize = 256 * 1024;

pub fn build_router(state: AppState) -> Router {
    let auth_routes = auth::router().layer(axum::middleware::from_fn_with_state(
        state.clone(),
        rate_limit::rate_limit_middleware,
    ));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/words", words::router())
        .nest("/learning", learning::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));

    let static_dir = Path::new(&state.config().static_dir);
    let spa_fallback = ServeDir::new(static_dir)
        .fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health::router())
        .fallback_service(spa_fallback)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .with_state(state)
}
