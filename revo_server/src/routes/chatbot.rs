//! Chatbot endpoint.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Request body for `POST /chatbot/chatbot`.
///
/// Missing fields deserialize as empty strings so they are reported the
/// same way as blank ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatbotRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub thread_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatbotResponse {
    pub response: String,
}

pub async fn chatbot_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<ChatbotRequest>, JsonRejection>,
) -> Result<Json<ChatbotResponse>> {
    let Json(request) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;

    let run = state
        .conversations
        .handle(&request.thread_id, &request.query);
    let outcome = tokio::time::timeout(state.request_timeout, run)
        .await
        .map_err(|_| ServerError::Timeout(state.request_timeout.as_millis()))??;

    info!(
        "Answered thread {} in {} model steps",
        request.thread_id.trim(),
        outcome.model_steps
    );
    Ok(Json(ChatbotResponse {
        response: outcome.response,
    }))
}

pub fn chatbot_routes() -> Router<AppState> {
    Router::new().route("/chatbot/chatbot", post(chatbot_handler))
}
