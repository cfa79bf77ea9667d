#![forbid(unsafe_code)]
//! Network node for picochain

use clap::Parser;
use picochain::api::{run_api_server, AppState};
use picochain::blockchain::Blockchain;
use picochain::config::load_config;
use picochain::registry::NodeRegistry;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "picochain-node", about = "Run a picochain ledger node")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Override the configured listen port
    #[arg(long)]
    port: Option<u16>,

    /// Override the configured node registry file
    #[arg(long)]
    registry: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = load_config(&args.config)?;
    if let Some(port) = args.port {
        config.network.port = port;
    }
    if let Some(registry) = args.registry {
        config.network.registry_path = registry;
    }

    let port = config.network.port;
    let base_url = config.base_url();

    let mut ledger = Blockchain::new(config.chain.difficulty, config.chain.mining_reward);
    ledger.ensure_genesis();

    let registry = NodeRegistry::new(&config.network.registry_path);
    registry.add(&base_url)?;

    tracing::info!(
        port,
        base_url = %base_url,
        difficulty = config.chain.difficulty,
        mining_reward = config.chain.mining_reward,
        peers = registry.list().len(),
        "starting picochain node"
    );

    let state = AppState::new(ledger, registry, base_url);
    run_api_server(state, port).await?;

    Ok(())
}
