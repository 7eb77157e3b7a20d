use std::sync::Arc;

use async_trait::async_trait;
use revo_core::{Tool, ToolDefinition, ToolResult, VectorCollection};
use revo_search::{SearchGateway, SearchRequest};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{empty_result, query_argument, query_schema, records_result};

pub const NAME: &str = "revoestate_information";
pub const DEFAULT_INDEX: &str = "revoinformation_vector_index";

/// Platform answers are short passages; fewer of them are enough.
const TOP_K: usize = 5;

const DESCRIPTION: &str = "Look up information about the Revoestate platform itself: its mission, services \
(property listings, company profiles), role in Ethiopian real estate, how to use the website (listing a \
property, searching for homes) and contact details. Returns passages with `text` and a relevance `score`. \
Use it for questions like \"What is Revoestate?\" or \"How do I list a property?\".";

/// One passage of platform documentation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlatformInfo {
    pub text: String,
    pub score: f64,
}

pub struct PlatformInfoTool {
    gateway: Arc<SearchGateway>,
    collection: Option<Arc<dyn VectorCollection>>,
    index_name: String,
}

impl PlatformInfoTool {
    pub fn new(gateway: Arc<SearchGateway>, collection: Option<Arc<dyn VectorCollection>>) -> Self {
        Self {
            gateway,
            collection,
            index_name: DEFAULT_INDEX.to_string(),
        }
    }

    #[must_use]
    pub fn with_index(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = index_name.into();
        self
    }
}

#[async_trait]
impl Tool for PlatformInfoTool {
    fn name(&self) -> &str {
        NAME
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: NAME.to_string(),
            description: DESCRIPTION.to_string(),
            input_schema: query_schema("The question about the platform, e.g. \"What is Revoestate?\""),
        }
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult {
        let Some(collection) = &self.collection else {
            return empty_result("Revoestate", "platform collection not provided");
        };
        let Some(query) = query_argument(&input) else {
            return empty_result("Revoestate", "missing query argument");
        };

        let request = SearchRequest::new(query, &self.index_name)
            .top_k(TOP_K)
            .content_field("text");
        let passages: Vec<PlatformInfo> = self
            .gateway
            .search(collection.as_ref(), &request)
            .await
            .into_iter()
            .map(|record| PlatformInfo {
                text: record.content,
                score: record.score,
            })
            .collect();
        info!("Revoestate query: {query}, results: {}", passages.len());

        records_result(NAME, &passages)
    }
}
