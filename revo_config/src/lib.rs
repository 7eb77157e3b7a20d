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
#![allow(clippy::missing_errors_doc)]

mod schema;

pub use schema::{
    AgentSettings, CollectionBinding, CollectionsConfig, Config, ConfigError, DatabaseConfig,
    ENV_API_KEY, ENV_DATABASE_URL, ProviderSettings, SearchConfig, ServerConfig,
};
