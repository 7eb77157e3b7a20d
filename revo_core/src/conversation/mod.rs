//! Conversation history keyed by thread identifier.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::Turn;

/// Pluggable persistence for conversation turns.
///
/// `append` must write the whole batch or nothing.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// All turns of `thread_id` in conversation order. Unknown threads are empty.
    async fn load(&self, thread_id: &str) -> anyhow::Result<Vec<Turn>>;

    async fn append(&self, thread_id: &str, turns: &[Turn]) -> anyhow::Result<()>;
}

#[async_trait]
impl<T: ConversationStore + ?Sized> ConversationStore for Arc<T> {
    async fn load(&self, thread_id: &str) -> anyhow::Result<Vec<Turn>> {
        (**self).load(thread_id).await
    }

    async fn append(&self, thread_id: &str, turns: &[Turn]) -> anyhow::Result<()> {
        (**self).append(thread_id, turns).await
    }
}

/// Process-local store. History is lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    threads: RwLock<HashMap<String, Vec<Turn>>>,
}

impl InMemoryConversationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn thread_count(&self) -> usize {
        self.threads.read().await.len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load(&self, thread_id: &str) -> anyhow::Result<Vec<Turn>> {
        Ok(self
            .threads
            .read()
            .await
            .get(thread_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, thread_id: &str, turns: &[Turn]) -> anyhow::Result<()> {
        let mut threads = self.threads.write().await;
        let history = threads.entry(thread_id.to_string()).or_default();
        history.extend_from_slice(turns);
        debug!(
            "Appended {} turns to thread {thread_id} (now {})",
            turns.len(),
            history.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_thread_is_empty() {
        let store = InMemoryConversationStore::new();
        assert!(store.load("missing").await.unwrap().is_empty());
        assert_eq!(store.thread_count().await, 0);
    }

    #[tokio::test]
    async fn append_preserves_order_per_thread() {
        let store = InMemoryConversationStore::new();
        store
            .append("a", &[Turn::user("one"), Turn::assistant("two", vec![])])
            .await
            .unwrap();
        store.append("b", &[Turn::user("other")]).await.unwrap();
        store.append("a", &[Turn::user("three")]).await.unwrap();

        let a = store.load("a").await.unwrap();
        let contents: Vec<&str> = a.iter().map(Turn::content).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
        assert_eq!(store.load("b").await.unwrap().len(), 1);
    }
}
