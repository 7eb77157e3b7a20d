use async_trait::async_trait;
use revo_core::{ConversationStore, Turn};
use revo_entities::conversations;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait, QueryOrder,
    QuerySelect, Schema, Set, TransactionTrait,
};
use tracing::{debug, info};

/// Conversation history in a relational database, one row per thread.
pub struct SeaOrmConversationStore {
    db: DatabaseConnection,
}

impl SeaOrmConversationStore {
    pub async fn connect(db_url: &str) -> anyhow::Result<Self> {
        info!("Connecting conversation store");
        let db = Database::connect(db_url).await?;
        Self::new(db).await
    }

    /// Wrap an open connection, creating the `conversations` table if needed.
    pub async fn new(db: DatabaseConnection) -> anyhow::Result<Self> {
        let backend = db.get_database_backend();
        let schema = Schema::new(backend);
        let mut stmt = schema.create_table_from_entity(conversations::Entity);
        stmt.if_not_exists();
        db.execute_unprepared(&backend.build(&stmt).to_string())
            .await?;

        info!("SeaOrmConversationStore initialized");
        Ok(Self { db })
    }

    pub async fn thread_ids(&self) -> anyhow::Result<Vec<String>> {
        let ids = conversations::Entity::find()
            .select_only()
            .column(conversations::Column::ThreadId)
            .order_by_asc(conversations::Column::CreatedAt)
            .into_tuple::<String>()
            .all(&self.db)
            .await?;
        Ok(ids)
    }

    pub async fn clear(&self, thread_id: &str) -> anyhow::Result<()> {
        conversations::Entity::delete_by_id(thread_id.to_owned())
            .exec(&self.db)
            .await?;

        info!("Cleared thread: {thread_id}");
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SeaOrmConversationStore {
    async fn load(&self, thread_id: &str) -> anyhow::Result<Vec<Turn>> {
        let Some(model) = conversations::Entity::find_by_id(thread_id.to_owned())
            .one(&self.db)
            .await?
        else {
            return Ok(Vec::new());
        };

        Ok(serde_json::from_str(&model.turns)?)
    }

    async fn append(&self, thread_id: &str, turns: &[Turn]) -> anyhow::Result<()> {
        if turns.is_empty() {
            return Ok(());
        }

        let now = chrono::Utc::now().naive_utc();
        let txn = self.db.begin().await?;

        let existing = conversations::Entity::find_by_id(thread_id.to_owned())
            .one(&txn)
            .await?;

        if let Some(model) = existing {
            let mut stored: Vec<Turn> = serde_json::from_str(&model.turns)?;
            stored.extend_from_slice(turns);
            let mut active: conversations::ActiveModel = model.into();
            active.turns = Set(serde_json::to_string(&stored)?);
            active.updated_at = Set(now);
            active.update(&txn).await?;
        } else {
            conversations::ActiveModel {
                thread_id: Set(thread_id.to_owned()),
                turns: Set(serde_json::to_string(turns)?),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        debug!("Appended {} turns to thread {thread_id}", turns.len());
        Ok(())
    }
}
