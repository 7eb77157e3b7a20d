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
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod agent;
pub mod conversation;
pub mod tools;
pub mod util;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use agent::{AgentConfig, AgentError, AgentLoop, RunOutcome};
pub use conversation::{ConversationStore, InMemoryConversationStore};
pub use tools::{Tool, ToolDefinition, ToolRegistry, ToolResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Assistant,
    ToolResult,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    /// Identifier, unique within the assistant turn that carries it.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// One immutable entry of a conversation's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "kebab-case")]
pub enum Turn {
    User {
        content: String,
    },
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },
    ToolResult {
        tool_call_id: String,
        name: String,
        content: String,
    },
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls,
        }
    }

    /// Result turn answering `call`.
    pub fn tool_result(call: &ToolCallRequest, content: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            content: content.into(),
        }
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::ToolResult { .. } => Role::ToolResult,
        }
    }

    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::User { content }
            | Self::Assistant { content, .. }
            | Self::ToolResult { content, .. } => content,
        }
    }

    /// Tool calls carried by an assistant turn; empty for every other role.
    #[must_use]
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
    pub usage: Option<Usage>,
}

impl LLMResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            usage: None,
        }
    }

    #[must_use]
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCallRequest>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    #[must_use]
    pub fn into_turn(self) -> Turn {
        Turn::assistant(self.content, self.tool_calls)
    }
}

#[derive(Debug, Clone)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Everything the model sees for one inference call.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    /// Prefixed to the history on every call, never stored as a turn.
    pub system: &'a str,
    pub turns: &'a [Turn],
    pub tools: &'a [ToolDefinition],
    pub temperature: f32,
    pub max_tokens: usize,
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn chat(&self, request: &ChatRequest<'_>) -> anyhow::Result<LLMResponse>;
    fn get_default_model(&self) -> &str;
}

#[async_trait]
impl<T: LLMProvider + ?Sized> LLMProvider for Arc<T> {
    async fn chat(&self, request: &ChatRequest<'_>) -> anyhow::Result<LLMResponse> {
        (**self).chat(request).await
    }

    fn get_default_model(&self) -> &str {
        (**self).get_default_model()
    }
}

/// Text to fixed-length vector. Implementations must be deterministic.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

#[async_trait]
impl<T: Embedder + ?Sized> Embedder for Arc<T> {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        (**self).embed(text).await
    }
}

/// Nearest-neighbour query against a named vector index.
#[derive(Debug, Clone, Copy)]
pub struct VectorQuery<'a> {
    pub index_name: &'a str,
    /// Document field holding the stored embedding.
    pub embedding_field: &'a str,
    pub vector: &'a [f32],
    /// Size of the approximate-search candidate pool.
    pub num_candidates: usize,
    pub limit: usize,
}

/// Raw document returned by a collection, before any projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: Map<String, Value>,
    pub score: f64,
}

#[async_trait]
pub trait VectorCollection: Send + Sync {
    fn name(&self) -> &str;

    /// Top `query.limit` documents by similarity, most similar first.
    async fn nearest(&self, query: &VectorQuery<'_>) -> anyhow::Result<Vec<ScoredDocument>>;
}

/// One ranked result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRecord {
    pub content: String,
    pub metadata: Map<String, Value>,
    pub score: f64,
}
