use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use revo_core::{ChatRequest, Embedder, LLMProvider, LLMResponse, ToolCallRequest, Turn, Usage};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4";
pub const DEFAULT_CHAT_MODEL: &str = "glm-4-flash";
pub const DEFAULT_EMBEDDING_MODEL: &str = "embedding-2";

/// Client for any endpoint speaking the OpenAI chat-completions and
/// embeddings wire format.
pub struct OpenAiCompatProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
    embedding_model: String,
    embedding_dimensions: Option<usize>,
    retry: RetryPolicy,
}

impl OpenAiCompatProvider {
    /// Convert f64 to f32 for embedding values
    /// Precision loss is acceptable for ML embeddings
    #[expect(clippy::cast_possible_truncation, reason = "ML embeddings use f32")]
    const fn f64_to_f32(x: f64) -> f32 {
        x as f32
    }

    pub fn new(api_key: String) -> Self {
        info!("Creating OpenAiCompatProvider");
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: None,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_default_model(mut self, model: String) -> Self {
        self.default_model = model;
        self
    }

    #[must_use]
    pub fn with_embedding_model(mut self, model: String, dimensions: Option<usize>) -> Self {
        self.embedding_model = model;
        self.embedding_dimensions = dimensions;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Helper method to send a single request
    async fn try_send(&self, request: &Value) -> reqwest::Result<Value> {
        self.client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await
    }
}

/// Transport failures, throttling and server errors are worth another attempt.
/// Client errors and undecodable bodies are not.
fn is_transient(error: &reqwest::Error) -> bool {
    if error.is_decode() {
        return false;
    }
    error
        .status()
        .is_none_or(|status| status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS)
}

/// Request body for `/chat/completions`.
fn build_request(request: &ChatRequest<'_>) -> Value {
    let mut body = json!({
        "model": request.model,
        "messages": build_messages(request),
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
    });
    if !request.tools.is_empty() {
        body["tools"] = request
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.input_schema,
                    }
                })
            })
            .collect();
    }
    body
}

fn build_messages(request: &ChatRequest<'_>) -> Vec<Value> {
    let mut messages = Vec::with_capacity(request.turns.len() + 1);
    if !request.system.is_empty() {
        messages.push(json!({"role": "system", "content": request.system}));
    }
    for turn in request.turns {
        let message = match turn {
            Turn::User { content } => json!({"role": "user", "content": content}),
            Turn::Assistant {
                content,
                tool_calls,
            } => {
                let mut message = json!({"role": "assistant", "content": content});
                if !tool_calls.is_empty() {
                    message["tool_calls"] = tool_calls
                        .iter()
                        .map(|call| {
                            json!({
                                "id": call.id,
                                "type": "function",
                                "function": {
                                    "name": call.name,
                                    "arguments": Value::Object(call.arguments.clone()).to_string(),
                                }
                            })
                        })
                        .collect();
                }
                message
            }
            Turn::ToolResult {
                tool_call_id,
                name,
                content,
            } => json!({
                "role": "tool",
                "tool_call_id": tool_call_id,
                "name": name,
                "content": content,
            }),
        };
        messages.push(message);
    }
    messages
}

fn parse_response(response: &Value) -> anyhow::Result<LLMResponse> {
    let message = response["choices"][0]["message"]
        .as_object()
        .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing message"))?;

    // Content is null when the model only calls tools.
    let content = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let tool_calls = match message.get("tool_calls").and_then(Value::as_array) {
        Some(calls) => calls
            .iter()
            .enumerate()
            .map(|(index, call)| parse_tool_call(index, call))
            .collect::<anyhow::Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    let usage = response["usage"].as_object().map(|u| Usage {
        prompt_tokens: u32::try_from(u["prompt_tokens"].as_u64().unwrap_or(0)).unwrap_or(0),
        completion_tokens: u32::try_from(u["completion_tokens"].as_u64().unwrap_or(0))
            .unwrap_or(0),
        total_tokens: u32::try_from(u["total_tokens"].as_u64().unwrap_or(0)).unwrap_or(0),
    });

    Ok(LLMResponse {
        content,
        tool_calls,
        usage,
    })
}

fn parse_tool_call(index: usize, call: &Value) -> anyhow::Result<ToolCallRequest> {
    let function = &call["function"];
    let name = function["name"]
        .as_str()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Invalid response format: tool call {index} has no name"))?;
    let id = call["id"]
        .as_str()
        .filter(|id| !id.is_empty())
        .map_or_else(|| format!("call_{index}"), str::to_string);

    let arguments = match &function["arguments"] {
        Value::Null => Map::new(),
        Value::Object(map) => map.clone(),
        Value::String(raw) if raw.trim().is_empty() => Map::new(),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            Ok(other) => anyhow::bail!("Arguments for tool {name} are not an object: {other}"),
            Err(e) => anyhow::bail!("Unparseable arguments for tool {name}: {e}"),
        },
        other => anyhow::bail!("Arguments for tool {name} are not an object: {other}"),
    };

    Ok(ToolCallRequest::new(id, name, arguments))
}

#[async_trait]
impl LLMProvider for OpenAiCompatProvider {
    async fn chat(&self, request: &ChatRequest<'_>) -> anyhow::Result<LLMResponse> {
        let body = build_request(request);

        info!(
            "Sending request to {}: model={}, turns={}, tools={}",
            self.base_url,
            request.model,
            request.turns.len(),
            request.tools.len()
        );

        let raw = self
            .retry
            .run_if(|| self.try_send(&body), is_transient)
            .await?;
        let response = parse_response(&raw)?;

        debug!("Received response: tool_calls={}", response.tool_calls.len());
        Ok(response)
    }

    fn get_default_model(&self) -> &str {
        &self.default_model
    }
}

#[async_trait]
impl Embedder for OpenAiCompatProvider {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut body = json!({
            "model": self.embedding_model,
            "input": text,
        });
        if let Some(dimensions) = self.embedding_dimensions {
            body["dimensions"] = json!(dimensions);
        }

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        let embedding = response["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing embedding"))?
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(Self::f64_to_f32)
                    .ok_or_else(|| anyhow::anyhow!("Invalid embedding value"))
            })
            .collect::<Result<Vec<f32>, _>>()?;

        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revo_core::ToolDefinition;

    fn search_call() -> ToolCallRequest {
        let mut arguments = Map::new();
        arguments.insert("query".to_string(), json!("Bole"));
        ToolCallRequest::new("call_a", "properties_vector_search", arguments)
    }

    #[test]
    fn messages_follow_history_order() {
        let call = search_call();
        let turns = vec![
            Turn::user("Any apartments in Bole?"),
            Turn::assistant("", vec![call.clone()]),
            Turn::tool_result(&call, "[]"),
        ];
        let request = ChatRequest {
            model: "glm-4-flash",
            system: "You are a helpful assistant.",
            turns: &turns,
            tools: &[],
            temperature: 0.0,
            max_tokens: 512,
        };

        let messages = build_messages(&request);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[2]["tool_calls"][0]["id"], "call_a");
        assert_eq!(
            messages[2]["tool_calls"][0]["function"]["arguments"],
            r#"{"query":"Bole"}"#
        );
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], "call_a");
    }

    #[test]
    fn tools_are_declared_as_functions() {
        let tools = vec![ToolDefinition {
            name: "companies_vector_search".to_string(),
            description: "Find companies".to_string(),
            input_schema: json!({"type": "object"}),
        }];
        let request = ChatRequest {
            model: "m",
            system: "",
            turns: &[],
            tools: &tools,
            temperature: 0.2,
            max_tokens: 16,
        };

        let body = build_request(&request);

        assert_eq!(body["messages"].as_array().map(Vec::len), Some(0));
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "companies_vector_search");
        assert_eq!(body["tools"][0]["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn no_tools_key_without_tools() {
        let request = ChatRequest {
            model: "m",
            system: "",
            turns: &[],
            tools: &[],
            temperature: 0.2,
            max_tokens: 16,
        };
        assert!(build_request(&request).get("tools").is_none());
    }

    #[test]
    fn parses_plain_answer() {
        let response = json!({
            "choices": [{"message": {"role": "assistant", "content": "Hello"}}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
        });

        let parsed = parse_response(&response).unwrap();

        assert_eq!(parsed.content, "Hello");
        assert!(parsed.tool_calls.is_empty());
        assert_eq!(parsed.usage.map(|u| u.total_tokens), Some(4));
    }

    #[test]
    fn parses_tool_calls() {
        let response = json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [
                    {"id": "c1", "type": "function",
                     "function": {"name": "properties_vector_search", "arguments": "{\"query\":\"Bole\"}"}},
                    {"type": "function",
                     "function": {"name": "companies_vector_search", "arguments": ""}}
                ]
            }}]
        });

        let parsed = parse_response(&response).unwrap();

        assert_eq!(parsed.content, "");
        assert_eq!(parsed.tool_calls.len(), 2);
        assert_eq!(parsed.tool_calls[0], search_call_with_id("c1"));
        assert_eq!(parsed.tool_calls[1].id, "call_1");
        assert!(parsed.tool_calls[1].arguments.is_empty());
    }

    fn search_call_with_id(id: &str) -> ToolCallRequest {
        let mut call = search_call();
        call.id = id.to_string();
        call
    }

    #[test]
    fn bad_arguments_are_an_error() {
        let response = json!({
            "choices": [{"message": {"tool_calls": [
                {"id": "c1", "function": {"name": "properties_vector_search", "arguments": "{query"}}
            ]}}]
        });
        assert!(parse_response(&response).is_err());

        let response = json!({
            "choices": [{"message": {"tool_calls": [
                {"id": "c1", "function": {"name": "properties_vector_search", "arguments": "[1]"}}
            ]}}]
        });
        assert!(parse_response(&response).is_err());
    }

    #[test]
    fn missing_choices_is_an_error() {
        assert!(parse_response(&json!({"error": "quota"})).is_err());
    }

    mod retries {
        use crate::openai_compat::OpenAiCompatProvider;
        use crate::retry::RetryPolicy;
        use reqwest::Client;
        use revo_core::{ChatRequest, LLMProvider};
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::time::Duration;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::{TcpListener, TcpStream};

        /// Serves the same canned response to every connection and counts them.
        async fn canned_server(status_line: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let hits = Arc::new(AtomicUsize::new(0));
            let counter = hits.clone();
            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    counter.fetch_add(1, Ordering::SeqCst);
                    read_request(&mut socket).await;
                    let response = format!(
                        "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
            });
            (format!("http://{addr}"), hits)
        }

        async fn read_request(socket: &mut TcpStream) {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap_or(0);
                if n == 0 {
                    return;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                    let length = head
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + length {
                        return;
                    }
                }
            }
        }

        fn provider(base_url: String) -> OpenAiCompatProvider {
            OpenAiCompatProvider {
                client: Client::builder().no_proxy().build().unwrap(),
                ..OpenAiCompatProvider::new("key".to_string())
                    .with_base_url(base_url)
                    .with_retry(RetryPolicy {
                        base_delays: vec![Duration::from_millis(1); 2],
                        final_retries: 0,
                        final_delay: Duration::ZERO,
                    })
            }
        }

        fn request() -> ChatRequest<'static> {
            ChatRequest {
                model: "glm-4-flash",
                system: "",
                turns: &[],
                tools: &[],
                temperature: 0.0,
                max_tokens: 16,
            }
        }

        #[tokio::test]
        async fn client_errors_fail_without_retrying() {
            let (url, hits) = canned_server("400 Bad Request", r#"{"error":"bad model"}"#).await;
            assert!(provider(url).chat(&request()).await.is_err());
            assert_eq!(hits.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn server_errors_use_the_whole_schedule() {
            let (url, hits) = canned_server("503 Service Unavailable", "{}").await;
            assert!(provider(url).chat(&request()).await.is_err());
            assert_eq!(hits.load(Ordering::SeqCst), 2);
        }

        #[tokio::test]
        async fn unparseable_completion_is_not_retried() {
            let (url, hits) = canned_server("200 OK", r#"{"error":"quota"}"#).await;
            assert!(provider(url).chat(&request()).await.is_err());
            assert_eq!(hits.load(Ordering::SeqCst), 1);
        }
    }
}
