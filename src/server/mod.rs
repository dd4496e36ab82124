//! HTTP API serving portfolio snapshots to the dashboard.

pub mod error;
pub mod handlers;
pub mod routes;

use anyhow::{Context, Result};
use std::net::{IpAddr, SocketAddr};
use tracing::info;
use warp::Filter;

use crate::core::PortfolioService;

/// Serves the API until Ctrl-C is received.
pub async fn serve(service: PortfolioService, host: &str, port: u16) -> Result<()> {
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("Invalid server host: {host}"))?;
    let addr = SocketAddr::new(ip, port);

    let api = routes::routes(service).with(warp::trace::request());

    let (bound, server) = warp::serve(api)
        .try_bind_with_graceful_shutdown(addr, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {e}");
            }
            info!("Shutdown signal received");
        })
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Serving portfolio API on http://{bound}");
    server.await;
    info!("Server stopped");
    Ok(())
}
