use api_state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post},
    Router,
};
use common::utils::ingest_limits::max_request_body_bytes;
use routes::{
    chat::{chat, chat_health, rag_chat},
    ingestion::upload_files,
    liveness::live,
    readiness::ready,
};

pub mod api_state;
pub mod error;
mod routes;

pub use routes::liveness::StatusBody;

/// Router for API functionality, version 1
pub fn api_routes_v1<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Probes for k8s/systemd
    let probes = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    let ingestion = Router::new().route(
        "/ingestion/upload",
        post(upload_files).layer(DefaultBodyLimit::max(max_request_body_bytes(
            &app_state.config,
        ))),
    );

    let chat_routes = Router::new()
        .route("/chat", post(chat))
        .route("/chat/rag", post(rag_chat))
        .route("/chat/health", get(chat_health));

    probes.merge(ingestion).merge(chat_routes)
}
