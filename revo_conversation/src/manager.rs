//! Request entry point shared by the HTTP server and the CLI.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use revo_core::{AgentError, AgentLoop, ConversationStore, LLMProvider, RunOutcome, Turn};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("Query is required")]
    EmptyQuery,

    #[error("Thread id is required")]
    EmptyThreadId,

    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl ConversationError {
    /// Whether the caller sent a bad request, as opposed to a fault on our side.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(self, Self::EmptyQuery | Self::EmptyThreadId)
    }
}

type ThreadLock = Arc<tokio::sync::Mutex<()>>;

/// Runs the agent loop for many threads at once, one run per thread at a time.
pub struct ConversationManager<P = Arc<dyn LLMProvider>, S = Arc<dyn ConversationStore>>
where
    P: Send + Sync,
    S: Send + Sync,
{
    agent: AgentLoop<P, S>,
    threads: Mutex<HashMap<String, ThreadLock>>,
}

impl<P, S> ConversationManager<P, S>
where
    P: LLMProvider + Send + Sync,
    S: ConversationStore + Send + Sync,
{
    pub fn new(agent: AgentLoop<P, S>) -> Self {
        info!(
            "Creating conversation manager: model={}, max_iterations={}",
            agent.config().model,
            agent.config().max_iterations
        );
        Self {
            agent,
            threads: Mutex::new(HashMap::new()),
        }
    }

    /// Answer `query` in `thread_id`. Requests on the same thread queue up
    /// behind each other; distinct threads run concurrently.
    pub async fn handle(
        &self,
        thread_id: &str,
        query: &str,
    ) -> Result<RunOutcome, ConversationError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ConversationError::EmptyQuery);
        }
        let thread_id = thread_id.trim();
        if thread_id.is_empty() {
            return Err(ConversationError::EmptyThreadId);
        }

        let slot = self.thread_slot(thread_id);
        let outcome = {
            let _guard = slot.lock.lock().await;
            self.agent.run(thread_id, query).await
        };
        drop(slot);

        Ok(outcome?)
    }

    /// Stored turns of `thread_id`, oldest first.
    pub async fn history(&self, thread_id: &str) -> Result<Vec<Turn>, ConversationError> {
        self.agent
            .store()
            .load(thread_id)
            .await
            .map_err(|e| ConversationError::Agent(AgentError::Store(e)))
    }

    /// Threads with a run in flight or queued.
    pub fn active_threads(&self) -> usize {
        self.threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn thread_slot<'a>(&'a self, thread_id: &'a str) -> ThreadSlot<'a> {
        let lock = self
            .threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(thread_id.to_string())
            .or_default()
            .clone();
        ThreadSlot {
            threads: &self.threads,
            thread_id,
            lock,
        }
    }
}

/// A run's claim on its thread lock. Dropping it, whether the run finished
/// or its future was cancelled, forgets the lock once nobody else holds or
/// awaits it.
struct ThreadSlot<'a> {
    threads: &'a Mutex<HashMap<String, ThreadLock>>,
    thread_id: &'a str,
    lock: ThreadLock,
}

impl Drop for ThreadSlot<'_> {
    fn drop(&mut self) {
        let mut threads = self.threads.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here.
        if threads
            .get(self.thread_id)
            .is_some_and(|lock| Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2)
        {
            threads.remove(self.thread_id);
            debug!("Released lock for thread {}", self.thread_id);
        }
    }
}
