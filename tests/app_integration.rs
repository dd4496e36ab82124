use std::fs;
use std::path::Path;
use tracing::info;

// Adds automatic logging to test
mod test_utils {
    use wiremock::matchers::{header, method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const COOKIE: &str = "A3=d=integration";
    pub const CRUMB: &str = "crumb-1";

    /// Serves charts and quotes for `symbols` (symbol, chart body, quote body) plus the
    /// cookie and crumb handshake. Every other symbol is an upstream outage.
    pub async fn create_yahoo_mock_server(symbols: &[(&str, &str, &str)]) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/session"))
            .respond_with(
                ResponseTemplate::new(404).insert_header("set-cookie", format!("{COOKIE}; Path=/")),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/test/getcrumb"))
            .and(header("cookie", COOKIE))
            .respond_with(ResponseTemplate::new(200).set_body_string(CRUMB))
            .mount(&mock_server)
            .await;

        for (symbol, chart, quote) in symbols {
            Mock::given(method("GET"))
                .and(path(format!("/v8/finance/chart/{symbol}")))
                .respond_with(ResponseTemplate::new(200).set_body_string(*chart))
                .mount(&mock_server)
                .await;
            Mock::given(method("GET"))
                .and(path("/v7/finance/quote"))
                .and(query_param("symbols", *symbol))
                .and(query_param("crumb", CRUMB))
                .and(header("cookie", COOKIE))
                .respond_with(ResponseTemplate::new(200).set_body_string(*quote))
                .mount(&mock_server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path_regex(r"^/v8/finance/chart/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v7/finance/quote"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub async fn create_google_mock_server(pages: &[(&str, &str)]) -> MockServer {
        let mock_server = MockServer::start().await;

        for (quote, body) in pages {
            Mock::given(method("GET"))
                .and(path(format!("/finance/quote/{quote}")))
                .respond_with(ResponseTemplate::new(200).set_body_string(*body))
                .mount(&mock_server)
                .await;
        }

        mock_server
    }
}

const ACME_CHART: &str = r#"{
    "chart": {
        "result": [{"meta": {"symbol": "ACME.NS", "currency": "INR", "regularMarketPrice": 120.0}}],
        "error": null
    }
}"#;

const ACME_QUOTE: &str = r#"{
    "quoteResponse": {
        "result": [{
            "symbol": "ACME.NS",
            "trailingPE": 30.0,
            "epsTrailingTwelveMonths": 4.0
        }],
        "error": null
    }
}"#;

const GHOST_PAGE: &str = r#"<html><body>
    <div data-last-price="55.5">₹55.50</div>
    <div><div aria-label="P/E ratio">P/E ratio</div><div>11.10</div></div>
    <div><div>EPS</div><div>₹5.00</div></div>
</body></html>"#;

fn write_config(dir: &Path, data_dir: &Path, yahoo: &str, google: &str) -> String {
    let config_path = dir.join("config.yaml");
    let config_content = format!(
        r#"
data_dir: "{}"
providers:
  yahoo:
    base_url: "{}"
    cookie_url: "{}/session"
  google:
    base_url: "{}"
fetch:
  retry:
    max_retries: 1
    initial_delay_ms: 1
    max_delay_ms: 5
"#,
        data_dir.display(),
        yahoo,
        yahoo,
        google
    );
    fs::write(&config_path, config_content).expect("Failed to write config file");
    config_path.to_string_lossy().into_owned()
}

async fn mocked_setup(holdings: &str) -> (tempfile::TempDir, String, Vec<wiremock::MockServer>) {
    let yahoo = test_utils::create_yahoo_mock_server(&[("ACME.NS", ACME_CHART, ACME_QUOTE)]).await;
    let google = test_utils::create_google_mock_server(&[("GHOST:NSE", GHOST_PAGE)]).await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(data_dir.join("holdings.json"), holdings).unwrap();

    let config_path = write_config(temp_dir.path(), &data_dir, &yahoo.uri(), &google.uri());
    (temp_dir, config_path, vec![yahoo, google])
}

const HOLDINGS: &str = r#"[
    {"name": "Acme", "sector": "Tech", "purchasePrice": 100, "quantity": 10, "ticker": "ACME"},
    {"name": "Ghost Power", "sector": "Energy", "purchasePrice": "50", "quantity": 4, "ticker": "GHOST"},
    {"name": "Vanished", "sector": "Energy", "purchasePrice": 10, "quantity": 5, "ticker": "GONE"},
    {"name": "", "sector": "Energy", "purchasePrice": 10, "quantity": 5}
]"#;

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let (_temp_dir, config_path, _servers) = mocked_setup(HOLDINGS).await;

    let result = folioboard::run_command(folioboard::AppCommand::Summary, Some(config_path.as_str())).await;
    assert!(
        result.is_ok(),
        "Main function failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_snapshot_with_provider_fallback() {
    let (_temp_dir, config_path, _servers) = mocked_setup(HOLDINGS).await;

    let config = folioboard::load_config(Some(config_path.as_str())).unwrap();
    let service = folioboard::build_service(&config).unwrap();
    let response = service.snapshot().await.unwrap();
    info!(?response.totals, "Snapshot built");

    assert_eq!(response.holdings.len(), 3);

    let acme = &response.holdings[0];
    assert_eq!(acme.ticker(), "ACME.NS");
    assert_eq!(acme.live().cmp, Some(120.0));
    assert_eq!(acme.live().pe_ttm, Some(30.0));
    assert_eq!(acme.live().latest_eps, Some(4.0));
    assert_eq!(acme.investment(), 1000.0);
    assert_eq!(acme.gain_loss(), 200.0);

    // Yahoo is down for this one, so the quote page fills in
    let ghost = &response.holdings[1];
    assert_eq!(ghost.ticker(), "GHOST.NS");
    assert_eq!(ghost.live().cmp, Some(55.5));
    assert_eq!(ghost.live().pe_ttm, Some(11.1));
    assert_eq!(ghost.live().latest_eps, Some(5.0));
    assert_eq!(ghost.present_value(), 222.0);

    // Neither source knows this one
    let gone = &response.holdings[2];
    assert_eq!(gone.live().cmp, None);
    assert_eq!(gone.present_value(), 0.0);
    assert_eq!(gone.gain_loss(), -50.0);

    assert_eq!(response.sectors.len(), 2);
    let energy = &response.sectors[1];
    assert_eq!(energy.sector, "Energy");
    assert_eq!(energy.total_investment, 250.0);
    assert_eq!(energy.total_present_value, 222.0);
    assert_eq!(response.totals.total_investment, 1250.0);

    let percent_sum: f64 = response.holdings.iter().map(|h| h.portfolio_percent()).sum();
    assert!((percent_sum - 100.0).abs() < 1e-9);

    let again = service.snapshot().await.unwrap();
    assert!(again.used_cache);
}

#[test_log::test(tokio::test)]
async fn test_legacy_export_is_read_when_no_other_file_exists() {
    let (temp_dir, config_path, _servers) = mocked_setup("[]").await;
    let data_dir = temp_dir.path().join("data");
    fs::remove_file(data_dir.join("holdings.json")).unwrap();
    fs::write(
        data_dir.join("portfolioTable.json"),
        r#"[
            {"Column2": "Particulars", "Column3": "Purchase Price", "Column4": "Qty", "Column7": "NSE/BSE"},
            {"Column2": "Tech Sector", "Column3": null, "Column4": null},
            {"Column2": "Acme", "Column3": 100, "Column4": 10, "Column7": "ACME"},
            {"Column2": "Sub total", "Column3": 1000, "Column4": "x"}
        ]"#,
    )
    .unwrap();

    let config = folioboard::load_config(Some(config_path.as_str())).unwrap();
    let response = folioboard::build_service(&config)
        .unwrap()
        .snapshot()
        .await
        .unwrap();

    assert_eq!(response.holdings.len(), 1);
    assert_eq!(response.holdings[0].sector(), "Tech Sector");
    assert_eq!(response.holdings[0].present_value(), 1200.0);
}

#[test_log::test(tokio::test)]
async fn test_missing_input_fails_the_command() {
    let (temp_dir, config_path, _servers) = mocked_setup("[]").await;
    fs::remove_file(temp_dir.path().join("data").join("holdings.json")).unwrap();

    let result = folioboard::run_command(folioboard::AppCommand::Summary, Some(config_path.as_str())).await;
    assert!(result.is_err());
}

#[test_log::test(tokio::test)]
#[ignore = "hits the live Yahoo APIs"]
async fn test_real_yahoo_quote_api() {
    use folioboard::core::QuoteProvider;
    use folioboard::providers::yahoo_finance::{
        DEFAULT_BASE_URL, DEFAULT_COOKIE_URL, YahooFinanceProvider,
    };

    let provider = YahooFinanceProvider::new(DEFAULT_BASE_URL, DEFAULT_COOKIE_URL).unwrap();
    let price = provider.fetch_price("RELIANCE.NS").await.unwrap();
    info!(?price, "Real API Response");
    assert!(price.is_some_and(|p| p > 0.0));

    let fundamentals = provider.fetch_fundamentals("RELIANCE.NS").await.unwrap();
    info!(?fundamentals, "Real API Response");
}
