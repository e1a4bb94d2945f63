use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .route("/database", get(database_health))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSecs": state.uptime_secs(),
    }))
}

async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Ready once the word store answers.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.repos().words.count_words() {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness probe failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn database_health(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let words = state.repos().words.count_words();
    let history = state.repos().history.count_history();
    let latency_us = start.elapsed().as_micros() as u64;

    let healthy = words.is_ok() && history.is_ok();
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(serde_json::json!({
            "healthy": healthy,
            "latencyUs": latency_us,
            "words": words.ok(),
            "historyRecords": history.ok(),
        })),
    )
}
