//! API routes.

pub mod chatbot;
pub mod health;

pub use chatbot::{ChatbotRequest, ChatbotResponse, chatbot_handler, chatbot_routes};
pub use health::{HealthResponse, health_routes};
