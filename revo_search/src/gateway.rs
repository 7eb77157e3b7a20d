//! Similarity search over a vector collection.
//!
//! The gateway embeds the query, asks the collection for its nearest
//! neighbours and projects each hit into a [`SearchRecord`]. Errors never
//! leave this module: they are logged and turned into an empty result.

use std::sync::Arc;

use revo_core::{Embedder, ScoredDocument, SearchRecord, VectorCollection, VectorQuery};
use serde_json::{Map, Value};
use tracing::{debug, error, info};

/// Field the raw embedding is stored under when nothing else is configured.
pub const DEFAULT_EMBEDDING_FIELD: &str = "revoemb";

/// Field that becomes [`SearchRecord::content`] unless the request overrides it.
pub const DEFAULT_CONTENT_FIELD: &str = "description";

/// Synthetic field carrying the similarity score.
pub const SCORE_FIELD: &str = "score";

/// Candidate pool size as a multiple of `k`.
pub const CANDIDATE_FACTOR: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub index_name: String,
    pub exclude_fields: Vec<String>,
    pub k: usize,
    pub content_field: String,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, index_name: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            index_name: index_name.into(),
            exclude_fields: Vec::new(),
            k: 10,
            content_field: DEFAULT_CONTENT_FIELD.to_string(),
        }
    }

    #[must_use]
    pub fn exclude(mut self, fields: &[&str]) -> Self {
        self.exclude_fields
            .extend(fields.iter().map(|f| (*f).to_string()));
        self
    }

    #[must_use]
    pub const fn top_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    #[must_use]
    pub fn content_field(mut self, field: impl Into<String>) -> Self {
        self.content_field = field.into();
        self
    }
}

pub struct SearchGateway {
    embedder: Arc<dyn Embedder>,
    embedding_field: String,
}

impl SearchGateway {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            embedding_field: DEFAULT_EMBEDDING_FIELD.to_string(),
        }
    }

    #[must_use]
    pub fn with_embedding_field(mut self, field: impl Into<String>) -> Self {
        self.embedding_field = field.into();
        self
    }

    #[must_use]
    pub fn embedding_field(&self) -> &str {
        &self.embedding_field
    }

    /// Ranked records for `request`, or an empty list if anything fails.
    pub async fn search(
        &self,
        collection: &dyn VectorCollection,
        request: &SearchRequest,
    ) -> Vec<SearchRecord> {
        match self.try_search(collection, request).await {
            Ok(records) => {
                info!(
                    "Vector search on {} ({}): {} results for {:?}",
                    collection.name(),
                    request.index_name,
                    records.len(),
                    request.query
                );
                records
            }
            Err(e) => {
                error!(
                    "Vector search error on {} ({}): {e:#}",
                    collection.name(),
                    request.index_name
                );
                Vec::new()
            }
        }
    }

    async fn try_search(
        &self,
        collection: &dyn VectorCollection,
        request: &SearchRequest,
    ) -> anyhow::Result<Vec<SearchRecord>> {
        if request.k == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(&request.query).await?;
        debug!("Embedded query into {} dimensions", vector.len());

        let query = VectorQuery {
            index_name: &request.index_name,
            embedding_field: &self.embedding_field,
            vector: &vector,
            num_candidates: request.k * CANDIDATE_FACTOR,
            limit: request.k,
        };
        let hits = collection.nearest(&query).await?;

        Ok(hits
            .into_iter()
            .map(|hit| self.project(hit, request))
            .collect())
    }

    fn project(&self, hit: ScoredDocument, request: &SearchRequest) -> SearchRecord {
        let mut fields: Map<String, Value> = hit.document;
        fields.insert(SCORE_FIELD.to_string(), Value::from(hit.score));

        for field in &request.exclude_fields {
            fields.remove(field);
        }
        fields.remove(&self.embedding_field);

        let content = match fields.remove(&request.content_field) {
            Some(Value::String(text)) => text,
            None | Some(Value::Null) => String::new(),
            Some(other) => other.to_string(),
        };
        let score = fields
            .get(SCORE_FIELD)
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        SearchRecord {
            content,
            metadata: fields,
            score,
        }
    }
}
