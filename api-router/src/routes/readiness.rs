use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tracing::warn;

use crate::api_state::ApiState;

/// Readiness probe: 200 when the vector index answers its health check, else 503.
pub async fn ready(State(state): State<ApiState>) -> impl IntoResponse {
    match state.index.health().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "checks": { "vector_index": "ok" }
            })),
        ),
        Err(e) => {
            warn!(backend = state.index.backend_label(), error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "error",
                    "checks": { "vector_index": "fail" },
                    "reason": e.public_detail()
                })),
            )
        }
    }
}
