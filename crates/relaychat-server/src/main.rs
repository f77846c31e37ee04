use anyhow::Result;
use clap::Parser;
use tracing::info;

mod config;
mod server;
mod telemetry;

use config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();

    telemetry::init(config.log_format)
        .map_err(|e| anyhow::anyhow!("Failed to init telemetry: {}", e))?;

    info!("Relaychat Server starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    config.log_config();

    server::start(config).await?;

    telemetry::shutdown();

    Ok(())
}
