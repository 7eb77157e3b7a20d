use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use super::{Tool, ToolDefinition, ToolResult};

/// Content returned to the model when it asks for a tool that is not registered.
pub const UNKNOWN_TOOL_MESSAGE: &str = "bad tool name, retry";

/// Tools available to the agent, in registration order.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. A tool with the same name replaces the earlier one in place.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        info!("Registering tool: {}", tool.name());
        if let Some(slot) = self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            *slot = tool;
        } else {
            self.tools.push(tool);
        }
    }

    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch `name`. Unknown names produce [`UNKNOWN_TOOL_MESSAGE`] instead of an error.
    pub async fn execute(&self, name: &str, input: serde_json::Value) -> ToolResult {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            warn!("Model requested unknown tool: {name}");
            return ToolResult::error(UNKNOWN_TOOL_MESSAGE).with_error_type("unknown_tool");
        };

        let started = Instant::now();
        let mut result = tool.execute(input).await;
        result.duration_ms = Some(started.elapsed().as_millis());
        if result.is_error && result.error_type.is_none() {
            result.error_type = Some("tool_error".to_string());
        }
        result
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo(&'static str);

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            self.0
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: self.0.to_string(),
                description: format!("echo from {}", self.0),
                input_schema: json!({"type": "object"}),
            }
        }

        async fn execute(&self, input: serde_json::Value) -> ToolResult {
            ToolResult::success(format!("{}:{input}", self.0))
        }
    }

    #[tokio::test]
    async fn dispatches_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo("first")));
        registry.register(Arc::new(Echo("second")));

        let result = registry.execute("second", json!({"q": 1})).await;
        assert!(!result.is_error);
        assert_eq!(result.content, r#"second:{"q":1}"#);
        assert!(result.duration_ms.is_some());
    }

    #[tokio::test]
    async fn unknown_tool_asks_model_to_retry() {
        let registry = ToolRegistry::new();
        let result = registry.execute("nope", json!({})).await;
        assert!(result.is_error);
        assert_eq!(result.content, UNKNOWN_TOOL_MESSAGE);
        assert_eq!(result.error_type.as_deref(), Some("unknown_tool"));
    }

    #[test]
    fn definitions_keep_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo("b")));
        registry.register(Arc::new(Echo("a")));
        registry.register(Arc::new(Echo("b")));

        assert_eq!(registry.list(), vec!["b", "a"]);
        assert_eq!(registry.definitions()[1].name, "a");
        assert_eq!(registry.len(), 2);
    }
}
