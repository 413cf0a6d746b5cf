use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::error;

use nop_types::api::HealthResponse;

use crate::auth::AppState;

/// Liveness of the database behind the API.
pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let sessions = state.sessions.clone();
    let healthy = tokio::task::spawn_blocking(move || sessions.health_check())
        .await
        .unwrap_or_else(|e| {
            error!("spawn_blocking join error: {}", e);
            false
        });

    let (status, label) = if healthy {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };

    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
        }),
    )
}
