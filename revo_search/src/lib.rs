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
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Similarity search over the property, company and platform collections.

mod gateway;
mod memory;
mod pgvector;
pub mod scoring;

pub use gateway::{
    CANDIDATE_FACTOR, DEFAULT_CONTENT_FIELD, DEFAULT_EMBEDDING_FIELD, SCORE_FIELD, SearchGateway,
    SearchRequest,
};
pub use memory::InMemoryCollection;
pub use pgvector::PgVectorCollection;
