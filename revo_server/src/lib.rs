#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::missing_errors_doc)]

//! HTTP front door for the chatbot.
//!
//! One JSON endpoint, `POST /chatbot/chatbot`, taking `{query, thread_id}`
//! and answering `{response}`, plus `GET /health`.

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ErrorResponse, Result, ServerError};
pub use routes::{ChatbotRequest, ChatbotResponse, HealthResponse};
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use revo_conversation::ConversationManager;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct Server {
    state: AppState,
}

impl Server {
    pub fn new(conversations: Arc<ConversationManager>, request_timeout: Duration) -> Self {
        Self {
            state: AppState::new(conversations, request_timeout),
        }
    }

    pub const fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(routes::health_routes())
            .merge(routes::chatbot_routes())
            .layer(TraceLayer::new_for_http())
            // Browsers call this from any storefront origin.
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(self.state.clone())
    }

    /// Serve until Ctrl-C.
    pub async fn run(self, addr: SocketAddr) -> Result<()> {
        let router = self.router();

        info!("Starting server on {}", addr);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {e}")))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {e}")))?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use revo_core::testing::{ScriptedProvider, call};
    use revo_core::{
        AgentConfig, AgentLoop, ChatRequest, ConversationStore, InMemoryConversationStore,
        LLMProvider, LLMResponse, ToolRegistry,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn server_with(provider: Arc<dyn LLMProvider>, timeout: Duration) -> Server {
        let store: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());
        let agent = AgentLoop::new(
            provider,
            store,
            Arc::new(ToolRegistry::new()),
            AgentConfig::default(),
        );
        Server::new(Arc::new(ConversationManager::new(agent)), timeout)
    }

    fn server(provider: ScriptedProvider) -> Server {
        server_with(Arc::new(provider), Duration::from_secs(5))
    }

    fn chatbot_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chatbot/chatbot")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    struct Stalled;

    #[async_trait]
    impl LLMProvider for Stalled {
        async fn chat(&self, _request: &ChatRequest<'_>) -> anyhow::Result<LLMResponse> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(LLMResponse::text("too late"))
        }

        fn get_default_model(&self) -> &'static str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn test_server_health_endpoint() {
        let app = server(ScriptedProvider::repeating(LLMResponse::text("hi"))).router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn chatbot_returns_final_answer() {
        let app = server(ScriptedProvider::new(vec![LLMResponse::text(
            "Bole has several apartments.",
        )]))
        .router();

        let (status, body) = send(
            app,
            chatbot_request(r#"{"query": "Any apartments in Bole?", "thread_id": "t-1"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"response": "Bole has several apartments."}));
    }

    #[tokio::test]
    async fn unknown_tool_does_not_fail_the_request() {
        let app = server(ScriptedProvider::new(vec![
            LLMResponse::text("").with_tool_calls(vec![call("c1", "weather", "Addis")]),
            LLMResponse::text("I can only help with real estate."),
        ]))
        .router();

        let (status, body) = send(
            app,
            chatbot_request(r#"{"query": "Weather?", "thread_id": "t-2"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "I can only help with real estate.");
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let app = server(ScriptedProvider::repeating(LLMResponse::text("hi"))).router();

        let (status, body) = send(app, chatbot_request(r#"{"query": "", "thread_id": "t"}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"detail": "Query is required"}));
    }

    #[tokio::test]
    async fn missing_query_is_rejected() {
        let app = server(ScriptedProvider::repeating(LLMResponse::text("hi"))).router();

        let (status, body) = send(app, chatbot_request(r#"{"thread_id": "t"}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Query is required");
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let app = server(ScriptedProvider::repeating(LLMResponse::text("hi"))).router();

        let (status, body) = send(app, chatbot_request("{not json")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn model_failure_is_a_generic_error() {
        let app = server(ScriptedProvider::new(Vec::new())).router();

        let (status, body) = send(
            app,
            chatbot_request(r#"{"query": "hello", "thread_id": "t"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"detail": "Internal Server Error"}));
    }

    #[tokio::test]
    async fn slow_request_times_out() {
        let app = server_with(Arc::new(Stalled), Duration::from_millis(20)).router();

        let (status, body) = send(
            app,
            chatbot_request(r#"{"query": "hello", "thread_id": "t"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal Server Error");
    }
}
