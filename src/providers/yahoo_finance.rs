use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{StatusCode, header};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::core::price::{Fundamentals, QuoteProvider};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_COOKIE_URL: &str = "https://fc.yahoo.com";

/// Cookie and crumb pair the quote API wants on every call.
#[derive(Debug, Clone)]
struct CrumbSession {
    cookie: String,
    crumb: String,
}

/// Yahoo Finance client and the primary source for prices and fundamentals. Prices come from
/// the chart API. Fundamentals need the quote API, which only answers with a session crumb.
pub struct YahooFinanceProvider {
    base_url: String,
    cookie_url: String,
    client: reqwest::Client,
    session: Mutex<Option<CrumbSession>>,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str, cookie_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("folioboard/1.0")
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(YahooFinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie_url: cookie_url.to_string(),
            client,
            session: Mutex::new(None),
        })
    }

    async fn fetch_chart(&self, ticker: &str) -> Result<Option<ChartMeta>> {
        let mut url =
            reqwest::Url::parse(&format!("{}/v8/finance/chart/{}", self.base_url, ticker))?;
        url.query_pairs_mut()
            .append_pair("interval", "1d")
            .append_pair("range", "1d");
        debug!("Requesting chart from {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {} URL: {}", e, ticker, url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                ticker
            ));
        }

        let text = response.text().await?;
        let data: YahooChartResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", ticker, e))?;

        Ok(data
            .chart
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|item| item.meta))
    }

    /// Returns the cached session, creating one on first use. The lock is held while the
    /// session is fetched so concurrent lookups share a single handshake.
    async fn session(&self) -> Result<CrumbSession> {
        let mut current = self.session.lock().await;
        if let Some(session) = current.as_ref() {
            return Ok(session.clone());
        }

        let session = self.fetch_session().await?;
        debug!("Obtained Yahoo crumb");
        *current = Some(session.clone());
        Ok(session)
    }

    async fn fetch_session(&self) -> Result<CrumbSession> {
        // The cookie host answers with an error status but still sets the cookie.
        let response = self
            .client
            .get(&self.cookie_url)
            .send()
            .await
            .with_context(|| {
                format!("Request error fetching session cookie from {}", self.cookie_url)
            })?;

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split_once(';').map_or(value, |(pair, _)| pair))
            .filter(|pair| !pair.is_empty())
            .ok_or_else(|| anyhow!("No session cookie returned by {}", self.cookie_url))?
            .to_string();

        let crumb_url = format!("{}/v1/test/getcrumb", self.base_url);
        let response = self
            .client
            .get(&crumb_url)
            .header(header::COOKIE, &cookie)
            .send()
            .await
            .with_context(|| format!("Request error fetching crumb from {crumb_url}"))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} fetching crumb", response.status()));
        }

        let crumb = response.text().await?.trim().to_string();
        if crumb.is_empty() {
            return Err(anyhow!("Empty crumb returned by {}", crumb_url));
        }
        Ok(CrumbSession { cookie, crumb })
    }

    async fn fetch_quote(&self, ticker: &str) -> Result<YahooQuote> {
        let session = self.session().await?;

        let mut url = reqwest::Url::parse(&format!("{}/v7/finance/quote", self.base_url))?;
        url.query_pairs_mut()
            .append_pair("symbols", ticker)
            .append_pair("crumb", &session.crumb);
        debug!("Requesting quote for {}", ticker);

        let response = self
            .client
            .get(url)
            .header(header::COOKIE, &session.cookie)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {}", e, ticker))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(%status, "Yahoo rejected the crumb, dropping the session");
            *self.session.lock().await = None;
        }
        if !status.is_success() {
            return Err(anyhow!("HTTP error: {} for symbol: {}", status, ticker));
        }

        let text = response.text().await?;
        let data: YahooQuoteResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", ticker, e))?;

        // A missing result means Yahoo has nothing for this symbol, not that the call failed.
        Ok(data
            .quote_response
            .result
            .into_iter()
            .next()
            .unwrap_or_default())
    }
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    // Unknown symbols come back as `null`
    #[serde(default)]
    result: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    #[serde(default)]
    meta: ChartMeta,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct ChartMeta {
    #[serde(deserialize_with = "finite_number")]
    regular_market_price: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct YahooQuoteResponse {
    #[serde(alias = "quoteResponse")]
    quote_response: QuoteResult,
}

#[derive(Deserialize, Debug, Default)]
struct QuoteResult {
    #[serde(default)]
    result: Vec<YahooQuote>,
}

/// Fields read from a quote. Anything missing or not a finite number is `None`.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct YahooQuote {
    #[serde(rename = "trailingPE", deserialize_with = "finite_number")]
    trailing_pe: Option<f64>,
    #[serde(deserialize_with = "finite_number")]
    eps_trailing_twelve_months: Option<f64>,
    #[serde(deserialize_with = "finite_number")]
    eps_current_year: Option<f64>,
}

impl YahooQuote {
    fn fundamentals(&self) -> Fundamentals {
        Fundamentals {
            pe_ttm: self.trailing_pe,
            latest_eps: self.eps_trailing_twelve_months.or(self.eps_current_year),
        }
    }
}

fn finite_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().filter(|n| n.is_finite()))
}

#[async_trait]
impl QuoteProvider for YahooFinanceProvider {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    #[instrument(name = "YahooPriceFetch", skip(self), fields(ticker = %ticker))]
    async fn fetch_price(&self, ticker: &str) -> Result<Option<f64>> {
        Ok(self
            .fetch_chart(ticker)
            .await?
            .and_then(|meta| meta.regular_market_price))
    }

    #[instrument(name = "YahooFundamentalsFetch", skip(self), fields(ticker = %ticker))]
    async fn fetch_fundamentals(&self, ticker: &str) -> Result<Fundamentals> {
        Ok(self.fetch_quote(ticker).await?.fundamentals())
    }
}
