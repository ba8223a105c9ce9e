use axum::{extract::State, response::IntoResponse, Json};
use retrieval_pipeline::RagAnswer;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::liveness::StatusBody;
use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
}

pub async fn chat_health() -> impl IntoResponse {
    Json(StatusBody::OK)
}

/// Plain generation, no retrieval.
pub async fn chat(
    State(state): State<ApiState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let answer = state.rag.chat(&request.message).await?;
    Ok(Json(ChatResponse { answer }))
}

pub async fn rag_chat(
    State(state): State<ApiState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<RagAnswer>, ApiError> {
    info!(
        message_chars = request.message.chars().count(),
        "Received RAG question"
    );

    let answer = state.rag.answer(&request.message).await?;
    Ok(Json(answer))
}
