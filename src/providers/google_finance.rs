//! Scrapes the Google Finance quote page. Used when Yahoo has no value.
//!
//! The page layout is not a stable interface. Every extraction step returns `None` on an
//! unexpected structure so a layout change degrades to missing values.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, instrument};

use crate::core::price::{Fundamentals, QuoteProvider};
use crate::core::ticker::ticker_base;

pub const DEFAULT_BASE_URL: &str = "https://www.google.com";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

static EMBEDDED_PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#""(?:lastPrice|regularMarketPrice|price)"\s*:\s*(?:\{\s*"raw"\s*:\s*)?"?(-?[0-9][0-9,]*(?:\.[0-9]+)?)"#,
    )
    .unwrap()
});

const PE_LABELS: &[&str] = &["P/E ratio"];
const EPS_LABELS: &[&str] = &["EPS", "Earnings per share"];

/// Ways of reading a price from the page, in the order they are tried.
const PRICE_STRATEGIES: &[fn(&str) -> Option<f64>] = &[price_from_attribute, price_from_json];

pub struct GoogleFinanceProvider {
    base_url: String,
    client: reqwest::Client,
}

impl GoogleFinanceProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn fetch_page(&self, ticker: &str) -> Result<String> {
        let exchange = if ticker.ends_with(".BO") { "BSE" } else { "NSE" };
        let mut url = reqwest::Url::parse(&format!(
            "{}/finance/quote/{}:{}",
            self.base_url,
            ticker_base(ticker),
            exchange
        ))?;
        url.query_pairs_mut()
            .append_pair("hl", "en")
            .append_pair("gl", "IN");
        debug!("Requesting quote page {}", url);

        let response = self
            .client
            .get(url)
            .header("Accept-Language", "en-IN,en;q=0.9")
            .header("Referer", "https://www.google.com/")
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {}", e, ticker))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                ticker
            ));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl QuoteProvider for GoogleFinanceProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    #[instrument(name = "GooglePriceFetch", skip(self), fields(ticker = %ticker))]
    async fn fetch_price(&self, ticker: &str) -> Result<Option<f64>> {
        let page = self.fetch_page(ticker).await?;
        Ok(parse_price(&page))
    }

    #[instrument(name = "GoogleFundamentalsFetch", skip(self), fields(ticker = %ticker))]
    async fn fetch_fundamentals(&self, ticker: &str) -> Result<Fundamentals> {
        let page = self.fetch_page(ticker).await?;
        Ok(parse_fundamentals(&page))
    }
}

pub fn parse_price(page: &str) -> Option<f64> {
    PRICE_STRATEGIES.iter().find_map(|strategy| strategy(page))
}

pub fn parse_fundamentals(page: &str) -> Fundamentals {
    let document = Html::parse_document(page);
    Fundamentals {
        pe_ttm: labelled_stat(&document, PE_LABELS),
        latest_eps: labelled_stat(&document, EPS_LABELS),
    }
}

fn price_from_attribute(page: &str) -> Option<f64> {
    let selector = Selector::parse("[data-last-price]").ok()?;
    let document = Html::parse_document(page);
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("data-last-price"))
        .find_map(parse_number)
}

fn price_from_json(page: &str) -> Option<f64> {
    EMBEDDED_PRICE
        .captures_iter(page)
        .filter_map(|caps| caps.get(1))
        .find_map(|m| parse_number(m.as_str()))
}

/// Value of a key statistic, found as the element right after its label.
fn labelled_stat(document: &Html, labels: &[&str]) -> Option<f64> {
    let all_divs = Selector::parse("div").ok()?;
    labels.iter().find_map(|label| {
        let by_aria = Selector::parse(&format!(r#"div[aria-label="{label}"]"#)).ok()?;
        document
            .select(&by_aria)
            .find_map(next_element_number)
            .or_else(|| {
                document
                    .select(&all_divs)
                    .filter(|el| el.text().collect::<String>().trim() == *label)
                    .find_map(next_element_number)
            })
    })
}

fn next_element_number(el: ElementRef<'_>) -> Option<f64> {
    let sibling = el.next_siblings().find_map(ElementRef::wrap)?;
    parse_number(&sibling.text().collect::<String>())
}

/// Parses a displayed number such as `₹2,450.10` or `24.51`, ignoring symbols and separators.
fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const QUOTE_PAGE: &str = r#"
        <html><body>
          <div class="price">
            <div jsname="ip75Cb" data-last-price="2450.1" data-currency-code="INR">
              <div class="YMlKec fxKbKc">₹2,450.10</div>
            </div>
          </div>
          <div class="gyFHrc">
            <span><div class="mfs7Fc">Market cap</div></span>
            <div class="P6K39c">16.58T INR</div>
          </div>
          <div class="gyFHrc">
            <div aria-label="P/E ratio" class="mfs7Fc">P/E ratio</div>
            <div class="P6K39c">24.51</div>
          </div>
          <div class="gyFHrc">
            <div class="mfs7Fc">EPS</div>
            <div class="P6K39c">₹99.96</div>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_price_from_data_attribute() {
        assert_eq!(parse_price(QUOTE_PAGE), Some(2450.1));
    }

    #[test]
    fn test_price_falls_back_to_embedded_json() {
        let page = r#"<html><body><div class="YMlKec">₹--</div>
            <script>AF_initDataCallback({data: {"symbol": "TCS", "lastPrice": "3,512.40"}});</script>
            </body></html>"#;
        assert_eq!(parse_price(page), Some(3512.4));

        let page = r#"<script>var q = {"regularMarketPrice":{"raw":812.55,"fmt":"812.55"}};</script>"#;
        assert_eq!(parse_price(page), Some(812.55));
    }

    #[test]
    fn test_price_missing_everywhere() {
        assert_eq!(parse_price("<html><body>Nothing here</body></html>"), None);
        assert_eq!(parse_price(r#"<div data-last-price="">x</div>"#), None);
    }

    #[test]
    fn test_fundamentals_from_labelled_stats() {
        let fundamentals = parse_fundamentals(QUOTE_PAGE);
        assert_eq!(fundamentals.pe_ttm, Some(24.51));
        assert_eq!(fundamentals.latest_eps, Some(99.96));
    }

    #[test]
    fn test_fundamentals_with_alternate_label_and_gaps() {
        let page = r#"<div>
            <div>Earnings per share</div><div>-3.20</div>
            <div aria-label="P/E ratio">P/E ratio</div><div>-</div>
        </div>"#;
        let fundamentals = parse_fundamentals(page);
        assert_eq!(fundamentals.latest_eps, Some(-3.2));
        assert_eq!(fundamentals.pe_ttm, None);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("₹1,234.50"), Some(1234.5));
        assert_eq!(parse_number(" 17.2 "), Some(17.2));
        assert_eq!(parse_number("—"), None);
        assert_eq!(parse_number("1.2.3"), None);
    }

    #[tokio::test]
    async fn test_fetch_uses_exchange_from_suffix() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/finance/quote/532174:BSE"))
            .and(query_param("hl", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_string(QUOTE_PAGE))
            .mount(&mock_server)
            .await;

        let provider = GoogleFinanceProvider::new(&mock_server.uri()).unwrap();
        assert_eq!(
            provider.fetch_price("532174.BO").await.unwrap(),
            Some(2450.1)
        );
        let fundamentals = provider.fetch_fundamentals("532174.BO").await.unwrap();
        assert_eq!(fundamentals.pe_ttm, Some(24.51));
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/finance/quote/INFY:NSE"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let provider = GoogleFinanceProvider::new(&mock_server.uri()).unwrap();
        let err = provider.fetch_price("INFY.NS").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "HTTP error: 429 Too Many Requests for symbol: INFY.NS"
        );
    }
}
