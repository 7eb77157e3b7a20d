//! Error types for the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use revo_conversation::ConversationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const INTERNAL_DETAIL: &str = "Internal Server Error";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),

    #[error("request did not finish within {0} ms")]
    Timeout(u128),

    #[error(transparent)]
    Conversation(#[from] ConversationError),

    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let user_error = match &self {
            Self::BadRequest(_) => true,
            Self::Conversation(e) => e.is_user_error(),
            Self::Timeout(_) | Self::Internal(_) => false,
        };

        // Faults on our side are logged in full and reported generically.
        let (status, detail) = if user_error {
            tracing::warn!(error = %self, "Client error");
            (StatusCode::BAD_REQUEST, self.to_string())
        } else {
            tracing::error!(error = %self, "Error in chatbot response");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_DETAIL.to_string())
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}
