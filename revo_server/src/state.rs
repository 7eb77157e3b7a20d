//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use revo_conversation::ConversationManager;

#[derive(Clone)]
pub struct AppState {
    pub conversations: Arc<ConversationManager>,

    /// Upper bound on one chatbot request. The run is dropped when it elapses.
    pub request_timeout: Duration,
}

impl AppState {
    pub const fn new(conversations: Arc<ConversationManager>, request_timeout: Duration) -> Self {
        Self {
            conversations,
            request_timeout,
        }
    }
}
