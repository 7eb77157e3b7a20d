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

//! Multi-turn conversations keyed by thread id.
//!
//! `ConversationManager` is the entry point for callers: it validates the
//! request, serializes runs that share a thread, and hands the work to the
//! agent loop. `SeaOrmConversationStore` keeps history across restarts.

mod manager;
mod store;

pub use manager::{ConversationError, ConversationManager};
pub use store::SeaOrmConversationStore;
