use std::net::SocketAddr;
use std::time::Duration;

use revo_config::Config;
use revo_server::Server;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ServeInput {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Strategy for running the HTTP server.
#[derive(Debug, Clone, Copy)]
pub struct ServeStrategy;

impl super::CommandStrategy for ServeStrategy {
    type Input = ServeInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let mut config = Config::load()?;
        if let Some(host) = input.host {
            config.server.host = host;
        }
        if let Some(port) = input.port {
            config.server.port = port;
        }

        let bind_address = config.server.bind_address();
        let addr: SocketAddr = bind_address
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address {bind_address}: {e}"))?;

        let conversations = super::build_conversations(&config, None).await?;
        let timeout = Duration::from_secs(config.server.request_timeout_secs);
        info!("Request timeout: {}s", timeout.as_secs());

        Server::new(conversations, timeout).run(addr).await?;
        Ok(())
    }
}
