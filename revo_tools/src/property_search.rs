use std::sync::Arc;

use async_trait::async_trait;
use revo_core::{Tool, ToolDefinition, ToolResult, VectorCollection};
use revo_search::{SearchGateway, SearchRequest};
use tracing::info;

use crate::{DEFAULT_TOP_K, empty_result, query_argument, query_schema, records_result};

pub const NAME: &str = "properties_vector_search";
pub const DEFAULT_INDEX: &str = "properties_vector_index";

/// Media fields too large to hand to the model.
const MEDIA_FIELDS: [&str; 2] = ["images", "panoramicImages"];

const DESCRIPTION: &str = "Search real estate properties in Addis Ababa, Ethiopia (homes, apartments, villas, condos and more). \
Returns a list of matches, each with `content` (the property description), `metadata` (title, price, \
location with subcity/district and coordinates when available, bedrooms, bathrooms, area, year built, amenities) \
and a relevance `score`. Use it for any question about listings, prices or neighbourhoods.";

pub struct PropertySearchTool {
    gateway: Arc<SearchGateway>,
    collection: Option<Arc<dyn VectorCollection>>,
    index_name: String,
    top_k: usize,
}

impl PropertySearchTool {
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
impl Tool for PropertySearchTool {
    fn name(&self) -> &str {
        NAME
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: NAME.to_string(),
            description: DESCRIPTION.to_string(),
            input_schema: query_schema(
                "What the user is looking for, e.g. \"apartments in Bole\" or \"villas with 3 bedrooms\"",
            ),
        }
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult {
        let Some(collection) = &self.collection else {
            return empty_result("Properties", "properties collection not provided");
        };
        let Some(query) = query_argument(&input) else {
            return empty_result("Properties", "missing query argument");
        };

        let request = SearchRequest::new(query, &self.index_name)
            .top_k(self.top_k)
            .exclude(&MEDIA_FIELDS);
        let records = self.gateway.search(collection.as_ref(), &request).await;
        info!("Properties query: {query}, results: {}", records.len());

        records_result(NAME, &records)
    }
}
