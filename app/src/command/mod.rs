//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy with its own input type, dispatched
//! statically from `main`.

use std::sync::Arc;

use revo_config::{CollectionBinding, Config};
use revo_conversation::{ConversationManager, SeaOrmConversationStore};
use revo_core::{AgentLoop, ConversationStore, LLMProvider};
use revo_providers::OpenAiCompatProvider;
use revo_search::{PgVectorCollection, SearchGateway};
use revo_tools::{BoundCollection, SearchBindings, search_registry};
use sea_orm::{Database, DatabaseConnection};
use tracing::info;

mod ask;
mod init;
mod serve;
mod version;

pub use ask::{AskInput, AskStrategy};
pub use init::InitStrategy;
pub use serve::{ServeInput, ServeStrategy};
pub use version::VersionStrategy;

/// Core trait defining the contract for all command strategies.
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Wire provider, store, collections and tools into a conversation manager.
///
/// Every configuration fault surfaces here, before anything is served.
async fn build_conversations(
    config: &Config,
    model: Option<String>,
) -> anyhow::Result<Arc<ConversationManager>> {
    config.validate()?;

    let mut agent_config = config.agent_config();
    if let Some(model) = model {
        agent_config.model = model;
    }

    let mut provider = OpenAiCompatProvider::new(config.provider.api_key.clone())
        .with_default_model(agent_config.model.clone());
    if let Some(base_url) = &config.provider.base_url {
        provider = provider.with_base_url(base_url.clone());
    }
    if let Some(embedding_model) = &config.provider.embedding_model {
        provider = provider
            .with_embedding_model(embedding_model.clone(), config.provider.embedding_dimensions);
    }
    let provider = Arc::new(provider);

    info!("Connecting to database");
    let db = Database::connect(config.database.url.as_str()).await?;
    let store: Arc<dyn ConversationStore> =
        Arc::new(SeaOrmConversationStore::new(db.clone()).await?);

    let gateway = SearchGateway::new(provider.clone())
        .with_embedding_field(config.search.embedding_field.clone());
    let bindings = SearchBindings {
        gateway: Arc::new(gateway),
        top_k: config.search.top_k,
        properties: bind_collection(&db, config.collections.properties.as_ref()).await?,
        companies: bind_collection(&db, config.collections.companies.as_ref()).await?,
        platform_info: bind_collection(&db, config.collections.platform_info.as_ref()).await?,
    };
    let tools = Arc::new(search_registry(&bindings));
    info!("Registered tools: {}", tools.list().join(", "));

    let provider: Arc<dyn LLMProvider> = provider;
    let agent = AgentLoop::new(provider, store, tools, agent_config);
    Ok(Arc::new(ConversationManager::new(agent)))
}

/// Open the table behind one tool and check its vector index exists.
async fn bind_collection(
    db: &DatabaseConnection,
    binding: Option<&CollectionBinding>,
) -> anyhow::Result<Option<BoundCollection>> {
    let Some(binding) = binding else {
        return Ok(None);
    };

    let collection = PgVectorCollection::new(db.clone(), &binding.table)?;
    collection.verify_index(&binding.index).await?;
    info!("Bound collection {} ({})", binding.table, binding.index);

    Ok(Some(BoundCollection::new(
        Arc::new(collection),
        binding.index.clone(),
    )))
}
