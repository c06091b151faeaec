use anyhow::{anyhow, Result};
use log::{info, warn};
use std::sync::Arc;

use modbus_explorer::cli::{build_cli, handle_subcommands};
use modbus_explorer::config::Config;
use modbus_explorer::modbus::{SessionConnector, SimulatedDevice, TcpConnector};
use modbus_explorer::services::ApiService;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    let config = Config::load(&matches).map_err(|e| anyhow!("Failed to load configuration: {}", e))?;

    // RUST_LOG wins over the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    if let Some(path) = matches.get_one::<String>("config") {
        info!("📄 Configuration loaded from {}", path);
    }

    if handle_subcommands(&matches, &config)
        .await
        .map_err(|e| anyhow!("{}", e))?
    {
        return Ok(());
    }

    info!("🚀 {} v{}", config.service_name, config.version);

    let simulate = matches
        .subcommand_matches("serve")
        .map(|m| m.get_flag("simulate"))
        .unwrap_or(false);

    let connector: Arc<dyn SessionConnector> = if simulate {
        warn!("🧪 Simulation mode: requests are answered by an in-memory device, not the network");
        Arc::new(SimulatedDevice::with_demo_data())
    } else {
        Arc::new(TcpConnector::new())
    };

    let mut api = ApiService::new(config, connector);
    api.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("🛑 Shutdown signal received");
    api.stop().await;

    Ok(())
}
