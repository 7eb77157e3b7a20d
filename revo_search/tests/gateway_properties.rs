use std::sync::Arc;

use revo_core::testing::HashEmbedder;
use revo_search::{InMemoryCollection, SearchGateway, SearchRequest};
use serde_json::{Map, Value, json};

fn listing(embedder: &HashEmbedder, title: &str, description: &str, subcity: &str) -> Map<String, Value> {
    let Value::Object(mut map) = json!({
        "title": title,
        "description": description,
        "subcity": subcity,
        "images": ["front.jpg", "kitchen.jpg"],
        "panoramicImages": ["360.jpg"],
    }) else {
        unreachable!()
    };
    map.insert(
        "revoemb".to_string(),
        json!(embedder.embed_sync(&format!("{title} {description} {subcity}"))),
    );
    map
}

fn properties(embedder: &HashEmbedder) -> InMemoryCollection {
    InMemoryCollection::new("properties", "properties_vector_index").with_documents(vec![
        listing(embedder, "3 bedroom villa", "Villa with garden near Edna Mall", "Bole"),
        listing(embedder, "2 bedroom apartment", "Apartment close to CMC road", "Yeka"),
        listing(embedder, "Studio condo", "Small condo in a quiet compound", "Kolfe"),
        listing(embedder, "Office space", "Commercial floor in Bole Atlas", "Bole"),
    ])
}

#[tokio::test]
async fn excluded_and_embedding_fields_never_leak() {
    let embedder = HashEmbedder::default();
    let collection = properties(&embedder);
    let gateway = SearchGateway::new(Arc::new(embedder));
    let request = SearchRequest::new("villa in Bole", "properties_vector_index")
        .exclude(&["images", "panoramicImages"]);

    let records = gateway.search(&collection, &request).await;

    assert_eq!(records.len(), 4);
    for record in &records {
        assert!(!record.metadata.contains_key("revoemb"));
        assert!(!record.metadata.contains_key("images"));
        assert!(!record.metadata.contains_key("panoramicImages"));
        assert!(record.metadata.contains_key("title"));
    }
    assert_eq!(records[0].metadata["title"], "3 bedroom villa");
}

#[tokio::test]
async fn identical_requests_return_identical_records() {
    let embedder = HashEmbedder::default();
    let collection = properties(&embedder);
    let gateway = SearchGateway::new(Arc::new(embedder));
    let request = SearchRequest::new("apartment Yeka", "properties_vector_index").top_k(3);

    let first = gateway.search(&collection, &request).await;
    let second = gateway.search(&collection, &request).await;

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

#[tokio::test]
async fn wrong_index_yields_empty_list() {
    let embedder = HashEmbedder::default();
    let collection = properties(&embedder);
    let gateway = SearchGateway::new(Arc::new(embedder));

    let records = gateway
        .search(&collection, &SearchRequest::new("villa", "companies_vector_index"))
        .await;

    assert!(records.is_empty());
}
