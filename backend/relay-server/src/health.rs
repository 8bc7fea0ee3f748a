use relay_ws::AppState;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// GET /health - status plus live connection count
pub async fn health(State(state): State<AppState>) -> Response {
    let shutting_down = state.shutdown.is_shutdown();

    let health = json!({
        "status": if shutting_down { "shutting_down" } else { "healthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "connections": state.registry.total_count().await,
        "auth": if state.jwt_validator.is_some() { "jwt" } else { "disabled" },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (StatusCode::OK, Json(health)).into_response()
}

/// GET /live - liveness probe (is the process alive?)
pub async fn liveness() -> Response {
    (StatusCode::OK, "OK").into_response()
}

/// GET /ready - readiness probe. Fails once shutdown starts or the server is full.
pub async fn readiness(State(state): State<AppState>) -> Response {
    if state.shutdown.is_shutdown() {
        return (StatusCode::SERVICE_UNAVAILABLE, "Shutting down").into_response();
    }
    if !state.registry.has_capacity().await {
        return (StatusCode::SERVICE_UNAVAILABLE, "At capacity").into_response();
    }

    (StatusCode::OK, "Ready").into_response()
}
