//! The fetch, derive and aggregate pipeline behind every portfolio snapshot.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::allocation::{grand_totals, sector_totals};
use super::analytics::derive_holdings;
use super::cache::Cache;
use super::holding::PortfolioResponse;
use super::normalize::normalize_rows;
use super::price::MarketData;
use super::source::PortfolioSource;
use super::ticker::UNKNOWN_TICKER;

const SNAPSHOT_KEY: &str = "portfolio";

/// Builds portfolio snapshots, reusing the last one while it is fresh.
#[derive(Clone)]
pub struct PortfolioService {
    source: Arc<PortfolioSource>,
    market: Arc<dyn MarketData>,
    cache: Cache<String, PortfolioResponse>,
    ttl: Duration,
}

impl PortfolioService {
    pub fn new(
        source: PortfolioSource,
        market: Arc<dyn MarketData>,
        cache: Cache<String, PortfolioResponse>,
        ttl: Duration,
    ) -> Self {
        Self {
            source: Arc::new(source),
            market,
            cache,
            ttl,
        }
    }

    /// Returns the current portfolio snapshot.
    ///
    /// A cached snapshot younger than the ttl is returned with `used_cache` set. Otherwise
    /// the holdings file is read again and live data fetched. Only a failure to load the
    /// holdings file is an error.
    pub async fn snapshot(&self) -> Result<PortfolioResponse> {
        let key = SNAPSHOT_KEY.to_string();
        if let Some(hit) = self.cache.get(&key, self.ttl).await {
            debug!(age = ?hit.age, "Serving cached portfolio");
            return Ok(PortfolioResponse {
                used_cache: true,
                ..hit.value
            });
        }

        let response = self.build().await?;
        self.cache.set(key, response.clone()).await;
        Ok(response)
    }

    /// Drops the cached snapshot so the next call rebuilds it.
    pub async fn invalidate(&self) {
        self.cache.clear(&SNAPSHOT_KEY.to_string()).await;
    }

    async fn build(&self) -> Result<PortfolioResponse> {
        let rows = self.source.load().with_context(|| {
            format!(
                "Failed to load holdings from {}",
                self.source.data_dir().display()
            )
        })?;
        let holdings = normalize_rows(&rows);

        let tickers: Vec<String> = holdings
            .iter()
            .filter(|h| h.ticker != UNKNOWN_TICKER)
            .map(|h| h.ticker.clone())
            .collect();

        // Sequential on purpose: both phases hit the same upstream hosts.
        let prices = self.market.fetch_prices(&tickers).await;
        let fundamentals = self.market.fetch_fundamentals(&tickers).await;

        let holdings = derive_holdings(holdings, &prices, &fundamentals);
        let sectors = sector_totals(&holdings);
        let totals = grand_totals(&holdings);
        info!(
            holdings = holdings.len(),
            sectors = sectors.len(),
            total_investment = totals.total_investment,
            "Built portfolio snapshot"
        );

        Ok(PortfolioResponse {
            last_updated: Utc::now(),
            holdings,
            sectors,
            totals,
            used_cache: false,
            page: None,
            limit: None,
            total_count: None,
        })
    }
}
