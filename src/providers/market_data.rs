use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::google_finance::GoogleFinanceProvider;
use super::util::{RetryPolicy, dedupe, run_pool};
use super::yahoo_finance::YahooFinanceProvider;
use crate::core::config::AppConfig;
use crate::core::price::{Fundamentals, MarketData, QuoteProvider, Resolvable};

/// Throughput settings for bulk fetches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    /// Requests in flight at once, per provider.
    pub concurrency: usize,
    /// Tickers per batch. Batches run one after another.
    pub batch_size: usize,
    /// Pause between batches.
    pub batch_delay_ms: u64,
    pub retry: RetryPolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            batch_size: 20,
            batch_delay_ms: 250,
            retry: RetryPolicy::default(),
        }
    }
}

/// Fetches prices and fundamentals from an ordered list of providers.
///
/// Each provider is only asked for the tickers that earlier providers left incomplete.
/// A ticker whose calls keep failing ends up with missing values; it never fails the
/// batch.
pub struct MarketDataFetcher {
    providers: Vec<Arc<dyn QuoteProvider>>,
    options: FetchOptions,
}

impl MarketDataFetcher {
    pub fn new(providers: Vec<Arc<dyn QuoteProvider>>, options: FetchOptions) -> Self {
        Self { providers, options }
    }

    /// Yahoo first, then the scraped quote page.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let yahoo = YahooFinanceProvider::new(
            &config.providers.yahoo.base_url,
            &config.providers.yahoo.cookie_url,
        )?;
        let google = GoogleFinanceProvider::new(&config.providers.google.base_url)?;
        let providers: Vec<Arc<dyn QuoteProvider>> = vec![Arc::new(yahoo), Arc::new(google)];
        Ok(Self::new(providers, config.fetch))
    }

    async fn resolve<V, F, Fut>(
        &self,
        tickers: &[String],
        what: &'static str,
        fetch: F,
    ) -> HashMap<String, V>
    where
        V: Resolvable,
        F: Fn(Arc<dyn QuoteProvider>, String) -> Fut + Sync,
        Fut: Future<Output = anyhow::Result<V>> + Send,
    {
        let unique = dedupe(tickers);
        let mut resolved: HashMap<String, V> =
            unique.iter().map(|t| (t.clone(), V::default())).collect();

        for provider in &self.providers {
            let pending: Vec<String> = unique
                .iter()
                .filter(|t| !resolved.get(*t).is_some_and(Resolvable::is_complete))
                .cloned()
                .collect();
            if pending.is_empty() {
                break;
            }
            debug!(
                provider = provider.name(),
                pending = pending.len(),
                "Resolving {what}"
            );

            let batches: Vec<&[String]> = pending.chunks(self.options.batch_size.max(1)).collect();
            let batch_count = batches.len();
            for (i, batch) in batches.into_iter().enumerate() {
                let results = run_pool(batch.to_vec(), self.options.concurrency, |ticker| {
                    let provider = Arc::clone(provider);
                    let fetch = &fetch;
                    let policy = self.options.retry;
                    async move {
                        let result = policy
                            .retry(|| fetch(Arc::clone(&provider), ticker.clone()))
                            .await;
                        (ticker, result)
                    }
                })
                .await;

                for (ticker, result) in results {
                    match result {
                        Ok(value) => resolved.entry(ticker).or_default().fill_from(value),
                        Err(e) => warn!(
                            provider = provider.name(),
                            ticker = %ticker,
                            error = %e,
                            "Giving up on {what}"
                        ),
                    }
                }

                if i + 1 < batch_count && self.options.batch_delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(self.options.batch_delay_ms)).await;
                }
            }
        }

        let missing = resolved.values().filter(|v| !v.is_complete()).count();
        info!(
            tickers = unique.len(),
            incomplete = missing,
            "Resolved {what}"
        );
        resolved
    }
}

#[async_trait]
impl MarketData for MarketDataFetcher {
    async fn fetch_prices(&self, tickers: &[String]) -> HashMap<String, Option<f64>> {
        self.resolve(tickers, "prices", |provider, ticker| async move {
            provider.fetch_price(&ticker).await
        })
        .await
    }

    async fn fetch_fundamentals(&self, tickers: &[String]) -> HashMap<String, Fundamentals> {
        self.resolve(tickers, "fundamentals", |provider, ticker| async move {
            provider.fetch_fundamentals(&ticker).await
        })
        .await
    }
}
