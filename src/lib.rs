pub mod cli;
pub mod core;
pub mod providers;
pub mod server;

pub use crate::core::config;

use crate::core::cache::Cache;
use crate::core::config::AppConfig;
use crate::core::source::PortfolioSource;
use crate::core::PortfolioService;
use crate::providers::MarketDataFetcher;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub enum AppCommand {
    /// Run the HTTP API, optionally overriding the configured port.
    Serve { port: Option<u16> },
    Summary,
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

/// Wires the configured providers, input directory and snapshot cache together.
pub fn build_service(config: &AppConfig) -> Result<PortfolioService> {
    let market = MarketDataFetcher::from_config(config)?;
    Ok(PortfolioService::new(
        PortfolioSource::new(&config.data_dir),
        Arc::new(market),
        Cache::new(),
        Duration::from_secs(config.cache_ttl_secs),
    ))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("folioboard starting...");
    let config = load_config(config_path)?;
    let service = build_service(&config)?;

    match command {
        AppCommand::Summary => cli::summary::run(&service).await,
        AppCommand::Serve { port } => {
            let port = port.unwrap_or(config.server.port);
            server::serve(service, &config.server.host, port).await
        }
    }
}
