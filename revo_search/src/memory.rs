use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use rayon::prelude::*;
use revo_core::{ScoredDocument, VectorCollection, VectorQuery};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::scoring::{cosine_similarity, vector_from_json};

/// Exact nearest-neighbour search over documents held in memory.
///
/// Each document stores its embedding under the queried embedding field.
/// Documents without a readable embedding never match. The candidate pool
/// size is ignored because the scan is exhaustive. Scans run on the blocking
/// pool against a snapshot, so inserts never wait on a search.
pub struct InMemoryCollection {
    name: String,
    index_name: String,
    documents: RwLock<Arc<Vec<Map<String, Value>>>>,
}

impl InMemoryCollection {
    pub fn new(name: impl Into<String>, index_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index_name: index_name.into(),
            documents: RwLock::new(Arc::default()),
        }
    }

    #[must_use]
    pub fn with_documents(self, documents: Vec<Map<String, Value>>) -> Self {
        Self {
            documents: RwLock::new(Arc::new(documents)),
            ..self
        }
    }

    pub async fn insert(&self, document: Map<String, Value>) {
        Arc::make_mut(&mut *self.documents.write().await).push(document);
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl VectorCollection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn nearest(&self, query: &VectorQuery<'_>) -> anyhow::Result<Vec<ScoredDocument>> {
        if query.index_name != self.index_name {
            anyhow::bail!(
                "index {} does not exist on collection {}",
                query.index_name,
                self.name
            );
        }

        let documents = self.documents.read().await.clone();
        let vector = query.vector.to_vec();
        let embedding_field = query.embedding_field.to_string();
        let limit = query.limit;

        let hits = tokio::task::spawn_blocking(move || rank(&documents, &vector, &embedding_field, limit))
            .await?;
        Ok(hits)
    }
}

fn rank(
    documents: &[Map<String, Value>],
    vector: &[f32],
    embedding_field: &str,
    limit: usize,
) -> Vec<ScoredDocument> {
    let mut scored: Vec<(usize, f64)> = documents
        .par_iter()
        .enumerate()
        .filter_map(|(position, document)| {
            let stored = vector_from_json(document.get(embedding_field)?)?;
            Some((position, cosine_similarity(vector, &stored)))
        })
        .collect();

    // Highest score first; insertion order breaks ties so results are repeatable.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
    scored.truncate(limit);

    scored
        .into_iter()
        .map(|(position, score)| ScoredDocument {
            document: documents[position].clone(),
            score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(name: &str, embedding: &[f32]) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".to_string(), json!(name));
        map.insert("revoemb".to_string(), json!(embedding));
        map
    }

    fn query<'a>(vector: &'a [f32], index: &'a str, limit: usize) -> VectorQuery<'a> {
        VectorQuery {
            index_name: index,
            embedding_field: "revoemb",
            vector,
            num_candidates: limit * 10,
            limit,
        }
    }

    #[tokio::test]
    async fn ranks_by_similarity() {
        let collection = InMemoryCollection::new("properties", "idx").with_documents(vec![
            document("far", &[0.0, 1.0]),
            document("near", &[1.0, 0.1]),
            document("exact", &[1.0, 0.0]),
        ]);

        let hits = collection.nearest(&query(&[1.0, 0.0], "idx", 2)).await.unwrap();

        let names: Vec<&str> = hits.iter().map(|h| h.document["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["exact", "near"]);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let collection = InMemoryCollection::new("c", "idx");
        collection.insert(document("first", &[1.0, 0.0])).await;
        collection.insert(document("second", &[2.0, 0.0])).await;

        let hits = collection.nearest(&query(&[1.0, 0.0], "idx", 10)).await.unwrap();
        assert_eq!(hits[0].document["name"], "first");
        assert_eq!(hits[1].document["name"], "second");
    }

    #[tokio::test]
    async fn unknown_index_is_an_error() {
        let collection = InMemoryCollection::new("c", "idx");
        assert!(collection.nearest(&query(&[1.0], "other", 1)).await.is_err());
    }

    #[tokio::test]
    async fn documents_without_embedding_are_skipped() {
        let mut plain = Map::new();
        plain.insert("name".to_string(), json!("no vector"));
        let collection = InMemoryCollection::new("c", "idx").with_documents(vec![plain]);

        assert_eq!(collection.len().await, 1);
        assert!(collection.nearest(&query(&[1.0], "idx", 5)).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn inserts_proceed_while_a_search_runs() {
        let collection = Arc::new(InMemoryCollection::new("c", "idx").with_documents(
            (0..500)
                .map(|i| document(&format!("doc-{i}"), &[1.0, f32::from(u16::try_from(i).unwrap())]))
                .collect(),
        ));

        let searching = {
            let collection = collection.clone();
            tokio::spawn(async move { collection.nearest(&query(&[1.0, 0.0], "idx", 3)).await })
        };
        collection.insert(document("late", &[1.0, 0.0])).await;

        let hits = searching.await.unwrap().unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(collection.len().await, 501);
    }
}
