//! Agent loop alternating between model inference and tool execution.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::tools::{ToolDefinition, ToolRegistry};
use crate::util::{DEFAULT_SYSTEM_PROMPT, truncate_for_log};
use crate::{ChatRequest, ConversationStore, LLMProvider, ToolCallRequest, Turn};

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    /// Upper bound on model steps per request.
    pub max_iterations: usize,
    pub system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "glm-4-flash".to_string(),
            max_tokens: 8192,
            temperature: 0.7,
            max_iterations: 10,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model inference failed: {0}")]
    Provider(#[source] anyhow::Error),

    #[error("conversation store error: {0}")]
    Store(#[source] anyhow::Error),

    #[error("could not complete the request within {0} model steps")]
    IterationLimit(usize),
}

/// Final answer of one run plus how much work it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub response: String,
    pub model_steps: usize,
    pub tool_calls: usize,
    /// Calls answered with an error result, unknown tools included.
    pub tool_errors: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Model,
    Tools,
    Done,
}

pub struct AgentLoop<P = Arc<dyn LLMProvider>, S = Arc<dyn ConversationStore>>
where
    P: Send + Sync,
    S: Send + Sync,
{
    provider: P,
    store: S,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl<P, S> AgentLoop<P, S>
where
    P: LLMProvider + Send + Sync,
    S: ConversationStore + Send + Sync,
{
    pub const fn new(provider: P, store: S, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            provider,
            store,
            tools,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Answer `query` within `thread_id`, running model and tool steps until
    /// the model stops requesting tools.
    ///
    /// Callers must not run two loops on the same thread at once.
    pub async fn run(&self, thread_id: &str, query: &str) -> Result<RunOutcome, AgentError> {
        info!("Processing message for thread: {thread_id}");

        let mut history = self.store.load(thread_id).await.map_err(AgentError::Store)?;
        let mut tool_calls = 0;
        let mut tool_errors = 0;

        // An earlier run stopped between the model asking for tools and the results landing.
        if let Some(last) = history.last().filter(|t| t.has_tool_calls()) {
            let pending = last.tool_calls().to_vec();
            warn!(
                "Thread {thread_id} has {} unanswered tool calls, completing them first",
                pending.len()
            );
            tool_calls += pending.len();
            let (results, failed) = self.tool_step(&pending).await;
            tool_errors += failed;
            self.commit(thread_id, &mut history, results).await?;
        }

        self.commit(thread_id, &mut history, vec![Turn::user(query)])
            .await?;

        let definitions = self.tools.definitions();
        let mut model_steps = 0;
        let mut step = Step::Model;

        loop {
            step = match step {
                Step::Model => {
                    if model_steps == self.config.max_iterations {
                        warn!(
                            "Thread {thread_id} hit the iteration limit ({})",
                            self.config.max_iterations
                        );
                        return Err(AgentError::IterationLimit(self.config.max_iterations));
                    }
                    model_steps += 1;

                    let turn = self.model_step(&history, &definitions).await?;
                    let next = if turn.has_tool_calls() {
                        Step::Tools
                    } else {
                        Step::Done
                    };
                    self.commit(thread_id, &mut history, vec![turn]).await?;
                    next
                }
                Step::Tools => {
                    let calls = history
                        .last()
                        .map(|t| t.tool_calls().to_vec())
                        .unwrap_or_default();
                    tool_calls += calls.len();
                    let (results, failed) = self.tool_step(&calls).await;
                    tool_errors += failed;
                    self.commit(thread_id, &mut history, results).await?;
                    Step::Model
                }
                Step::Done => {
                    let response = history
                        .last()
                        .map(|t| t.content().to_string())
                        .unwrap_or_default();
                    info!(
                        "Thread {thread_id} finished after {model_steps} model steps and {tool_calls} tool calls ({tool_errors} failed)"
                    );
                    return Ok(RunOutcome {
                        response,
                        model_steps,
                        tool_calls,
                        tool_errors,
                    });
                }
            };
        }
    }

    async fn model_step(
        &self,
        history: &[Turn],
        definitions: &[ToolDefinition],
    ) -> Result<Turn, AgentError> {
        let request = ChatRequest {
            model: &self.config.model,
            system: &self.config.system_prompt,
            turns: history,
            tools: definitions,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        debug!(
            "Model step: {} turns, {} tools",
            history.len(),
            definitions.len()
        );

        let response = self
            .provider
            .chat(&request)
            .await
            .map_err(AgentError::Provider)?;

        if let Some(usage) = &response.usage {
            debug!(
                "Tokens: {} prompt + {} completion = {} total",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }

        Ok(response.into_turn())
    }

    /// One result turn per call, in call order, plus how many calls failed.
    async fn tool_step(&self, calls: &[ToolCallRequest]) -> (Vec<Turn>, usize) {
        let mut results = Vec::with_capacity(calls.len());
        let mut failed = 0;
        for call in calls {
            info!("Calling tool {} ({})", call.name, call.id);
            let input = serde_json::Value::Object(call.arguments.clone());
            let result = self.tools.execute(&call.name, input).await;
            if result.is_error {
                failed += 1;
                warn!(
                    "Tool {} ({}) failed [{}]: {}",
                    call.name,
                    call.id,
                    result.error_type.as_deref().unwrap_or("tool_error"),
                    truncate_for_log(&result.content, 200)
                );
            }
            debug!(
                "Tool {} returned {} bytes in {}ms: {}",
                call.name,
                result.content.len(),
                result.duration_ms.unwrap_or_default(),
                truncate_for_log(&result.content, 200)
            );
            results.push(Turn::tool_result(call, result.content));
        }
        (results, failed)
    }

    /// Persist a finished step, then make it visible to the next step.
    async fn commit(
        &self,
        thread_id: &str,
        history: &mut Vec<Turn>,
        turns: Vec<Turn>,
    ) -> Result<(), AgentError> {
        self.store
            .append(thread_id, &turns)
            .await
            .map_err(AgentError::Store)?;
        history.extend(turns);
        Ok(())
    }
}
