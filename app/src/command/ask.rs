use revo_config::Config;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AskInput {
    pub message: String,
    /// Thread to continue; a fresh one is used when absent
    pub thread: Option<String>,
    pub model: Option<String>,
}

/// Strategy for answering one question from the terminal.
#[derive(Debug, Clone, Copy)]
pub struct AskStrategy;

impl super::CommandStrategy for AskStrategy {
    type Input = AskInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let conversations = super::build_conversations(&config, input.model).await?;

        let thread_id = input
            .thread
            .unwrap_or_else(|| format!("cli:{}", Uuid::now_v7()));
        info!("Using thread: {thread_id}");

        let outcome = conversations.handle(&thread_id, &input.message).await?;
        println!("{}", outcome.response);
        Ok(())
    }
}
