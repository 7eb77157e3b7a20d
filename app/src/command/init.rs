use revo_config::Config;

/// Strategy for initializing the configuration.
///
/// Creates the default configuration file at `~/revo/config.json`.
#[derive(Debug, Clone, Copy)]
pub struct InitStrategy;

impl super::CommandStrategy for InitStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config_path = Config::create_config()?;

        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Next steps:");
        println!(
            "   1. Set provider.api_key (or export {})",
            revo_config::ENV_API_KEY
        );
        println!("   2. Point database.url at the Postgres instance holding the listings");
        println!("   3. Run 'revo serve' and POST to /chatbot/chatbot");
        Ok(())
    }
}
