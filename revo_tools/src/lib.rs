//! Search tools exposed to the model.
//!
//! Every tool is built with the collection it searches bound once at
//! startup. A tool whose collection is missing still answers, with an empty
//! list, so one bad binding never ends a conversation.

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

pub mod company_search;
pub mod platform_info;
pub mod property_search;

pub use company_search::CompanySearchTool;
pub use platform_info::{PlatformInfo, PlatformInfoTool};
pub use property_search::PropertySearchTool;

use std::sync::Arc;

use revo_core::{ToolRegistry, ToolResult, VectorCollection};
use revo_search::SearchGateway;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::error;

/// Results per property or company search unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 10;

/// A collection together with the vector index the tool queries on it.
#[derive(Clone)]
pub struct BoundCollection {
    pub collection: Arc<dyn VectorCollection>,
    pub index_name: String,
}

impl BoundCollection {
    pub fn new(collection: Arc<dyn VectorCollection>, index_name: impl Into<String>) -> Self {
        Self {
            collection,
            index_name: index_name.into(),
        }
    }
}

/// Collections and the gateway shared by the search tools.
#[derive(Clone)]
pub struct SearchBindings {
    pub gateway: Arc<SearchGateway>,
    pub top_k: usize,
    pub properties: Option<BoundCollection>,
    pub companies: Option<BoundCollection>,
    pub platform_info: Option<BoundCollection>,
}

/// Split a binding into the tool's collection and index, keeping `default_index`
/// when the collection is unbound.
fn unpack(
    binding: Option<&BoundCollection>,
    default_index: &str,
) -> (Option<Arc<dyn VectorCollection>>, String) {
    binding.map_or_else(
        || (None, default_index.to_string()),
        |b| (Some(b.collection.clone()), b.index_name.clone()),
    )
}

/// Registry holding the property, company and platform-information tools.
#[must_use]
pub fn search_registry(bindings: &SearchBindings) -> ToolRegistry {
    let gateway = &bindings.gateway;
    let mut registry = ToolRegistry::new();

    let (collection, index) = unpack(bindings.properties.as_ref(), property_search::DEFAULT_INDEX);
    registry.register(Arc::new(
        PropertySearchTool::new(gateway.clone(), collection)
            .with_index(index)
            .with_top_k(bindings.top_k),
    ));

    let (collection, index) = unpack(bindings.companies.as_ref(), company_search::DEFAULT_INDEX);
    registry.register(Arc::new(
        CompanySearchTool::new(gateway.clone(), collection)
            .with_index(index)
            .with_top_k(bindings.top_k),
    ));

    let (collection, index) = unpack(bindings.platform_info.as_ref(), platform_info::DEFAULT_INDEX);
    registry.register(Arc::new(
        PlatformInfoTool::new(gateway.clone(), collection).with_index(index),
    ));

    registry
}

/// Schema shared by all search tools: one free-text `query`.
fn query_schema(description: &str) -> Value {
    revo_core::tools::schema_object(
        json!({
            "query": {
                "type": "string",
                "description": description,
            }
        }),
        &["query"],
    )
}

/// The non-blank `query` argument, if present.
fn query_argument(input: &Value) -> Option<&str> {
    input
        .get("query")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())
}

/// Serialize search output for a tool-result turn. Falls back to `[]`.
fn records_result<T: Serialize>(tool: &str, records: &[T]) -> ToolResult {
    match serde_json::to_string(records) {
        Ok(content) => ToolResult::success(content),
        Err(e) => {
            error!("{tool}: failed to serialize results: {e}");
            ToolResult::success("[]")
        }
    }
}

/// Empty result for a call that cannot be served.
fn empty_result(tool: &str, reason: &str) -> ToolResult {
    error!("{tool} search error: {reason}");
    ToolResult::success("[]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use revo_core::testing::HashEmbedder;

    #[test]
    fn query_argument_requires_text() {
        assert_eq!(query_argument(&json!({"query": " Bole "})), Some("Bole"));
        assert_eq!(query_argument(&json!({"query": "   "})), None);
        assert_eq!(query_argument(&json!({"query": 3})), None);
        assert_eq!(query_argument(&json!({})), None);
    }

    #[test]
    fn registry_exposes_three_tools() {
        let bindings = SearchBindings {
            gateway: Arc::new(SearchGateway::new(Arc::new(HashEmbedder::default()))),
            top_k: DEFAULT_TOP_K,
            properties: None,
            companies: None,
            platform_info: None,
        };
        let registry = search_registry(&bindings);

        assert_eq!(
            registry.list(),
            vec![
                "properties_vector_search",
                "companies_vector_search",
                "revoestate_information"
            ]
        );
        for definition in registry.definitions() {
            assert_eq!(definition.input_schema["required"][0], "query");
            assert!(!definition.description.is_empty());
        }
    }
}
