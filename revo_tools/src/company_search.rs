use std::sync::Arc;

use async_trait::async_trait;
use revo_core::{Tool, ToolDefinition, ToolResult, VectorCollection};
use revo_search::{SearchGateway, SearchRequest};
use tracing::info;

use crate::{DEFAULT_TOP_K, empty_result, query_argument, query_schema, records_result};

pub const NAME: &str = "companies_vector_search";
pub const DEFAULT_INDEX: &str = "companies_vector_index";

const DESCRIPTION: &str = "Search real estate companies and agencies in Addis Ababa, Ethiopia. \
Returns a list of matches, each with `content` (the company description), `metadata` (name, services, \
phone, email, website, address with coordinates, years in operation, notable projects) and a relevance `score`. \
Use it when the user asks about a company, e.g. \"Tell me about ABC Realty\".";

pub struct CompanySearchTool {
    gateway: Arc<SearchGateway>,
    collection: Option<Arc<dyn VectorCollection>>,
    index_name: String,
    top_k: usize,
}

impl CompanySearchTool {
    pub fn new(gateway: Arc<SearchGateway>, collection: Option<Arc<dyn VectorCollection>>) -> Self {
        Self {
            gateway,
            collection,
            index_name: DEFAULT_INDEX.to_string(),
            top_k: DEFAULT_TOP_K,
        }
    }

    #[must_use]
    pub fn with_index(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = index_name.into();
        self
    }

    #[must_use]
    pub const fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

#[async_trait]
impl Tool for CompanySearchTool {
    fn name(&self) -> &str {
        NAME
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: NAME.to_string(),
            description: DESCRIPTION.to_string(),
            input_schema: query_schema(
                "The company or kind of company, e.g. \"real estate companies in Addis\"",
            ),
        }
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult {
        let Some(collection) = &self.collection else {
            return empty_result("Companies", "companies collection not provided");
        };
        let Some(query) = query_argument(&input) else {
            return empty_result("Companies", "missing query argument");
        };

        let request = SearchRequest::new(query, &self.index_name).top_k(self.top_k);
        let records = self.gateway.search(collection.as_ref(), &request).await;
        info!("Companies query: {query}, results: {}", records.len());

        records_result(NAME, &records)
    }
}
