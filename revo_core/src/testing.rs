//! Deterministic collaborators for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{ChatRequest, Embedder, LLMProvider, LLMResponse, ToolCallRequest, Turn};

/// Build a tool call whose only argument is `query`.
#[must_use]
pub fn call(id: &str, name: &str, query: &str) -> ToolCallRequest {
    let mut args = Map::new();
    args.insert("query".to_string(), Value::String(query.to_string()));
    ToolCallRequest::new(id, name, args)
}

#[derive(Debug, Clone)]
struct SeenRequest {
    system: String,
    turns: Vec<Turn>,
    tools: Vec<String>,
}

/// Replays canned responses in order and records what the model was shown.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<LLMResponse>>,
    repeat: Option<LLMResponse>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedProvider {
    #[must_use]
    pub fn new(responses: Vec<LLMResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            repeat: None,
            seen: Mutex::default(),
        }
    }

    /// Returns `response` for every call.
    #[must_use]
    pub fn repeating(response: LLMResponse) -> Self {
        Self {
            script: Mutex::default(),
            repeat: Some(response),
            seen: Mutex::default(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.seen().len()
    }

    /// History passed on each call, in call order.
    pub fn histories(&self) -> Vec<Vec<Turn>> {
        self.seen().into_iter().map(|s| s.turns).collect()
    }

    pub fn systems(&self) -> Vec<String> {
        self.seen().into_iter().map(|s| s.system).collect()
    }

    pub fn tool_names(&self) -> Vec<Vec<String>> {
        self.seen().into_iter().map(|s| s.tools).collect()
    }

    fn seen(&self) -> Vec<SeenRequest> {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat(&self, request: &ChatRequest<'_>) -> anyhow::Result<LLMResponse> {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(SeenRequest {
                system: request.system.to_string(),
                turns: request.turns.to_vec(),
                tools: request.tools.iter().map(|t| t.name.clone()).collect(),
            });

        let next = self
            .script
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front();
        next.or_else(|| self.repeat.clone())
            .ok_or_else(|| anyhow::anyhow!("scripted provider has no response left"))
    }

    fn get_default_model(&self) -> &'static str {
        "scripted"
    }
}

/// Bag-of-words embedding: each lowercase word bumps one hashed dimension.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    #[must_use]
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions.max(1)];
        let len = vector.len() as u64;
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
                    (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
                });
            #[allow(clippy::cast_possible_truncation)]
            let slot = (hash % len) as usize;
            vector[slot] += 1.0;
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }
}
