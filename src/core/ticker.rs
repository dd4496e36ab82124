//! Resolves free-form symbols from the holdings file into exchange-qualified tickers.

use crate::core::holding::Exchange;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

pub const UNKNOWN_TICKER: &str = "UNKNOWN";

static ALPHA_TICKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z&\-]+$").unwrap());
static NUMERIC_TICKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{4,6}$").unwrap());

/// Large-cap NSE symbols shown in the "popular" view.
const POPULAR_BASES: &[&str] = &[
    "RELIANCE",
    "TCS",
    "INFY",
    "HDFCBANK",
    "ICICIBANK",
    "SBIN",
    "AXISBANK",
    "KOTAKBANK",
    "ITC",
    "LT",
    "LTIM",
    "HINDUNILVR",
    "TATAMOTORS",
    "MARUTI",
    "TATAPOWER",
    "TATACONSUMER",
    "PIDILITIND",
    "ASTRAL",
    "POLYCAB",
    "ASIANPAINT",
    "ULTRACEMCO",
    "BHARTIARTL",
    "SUNPHARMA",
    "BAJFINANCE",
    "BAJAJFINSV",
    "HCLTECH",
    "WIPRO",
    "TECHM",
    "POWERGRID",
    "NTPC",
    "ONGC",
    "COALINDIA",
    "TITAN",
    "NESTLEIND",
    "BRITANNIA",
    "ADANIENT",
    "ADANIPORTS",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedTicker {
    pub ticker: String,
    pub exchange: Exchange,
}

impl DerivedTicker {
    pub fn unknown() -> Self {
        Self {
            ticker: UNKNOWN_TICKER.to_string(),
            exchange: Exchange::Unknown,
        }
    }
}

/// Derives a ticker from a JSON cell, which may hold a symbol string or a BSE scrip code.
///
/// Never fails: anything unrecognised resolves to [`DerivedTicker::unknown`].
pub fn derive_ticker(raw: &Value) -> DerivedTicker {
    match raw {
        Value::String(s) => derive_ticker_str(s),
        Value::Number(n) => n
            .as_f64()
            .map(derive_ticker_code)
            .unwrap_or_else(DerivedTicker::unknown),
        _ => DerivedTicker::unknown(),
    }
}

pub fn derive_ticker_str(raw: &str) -> DerivedTicker {
    let cleaned = raw.trim().to_uppercase();

    if let Some(exchange) = qualified_exchange(&cleaned) {
        return DerivedTicker {
            ticker: cleaned,
            exchange,
        };
    }
    if ALPHA_TICKER.is_match(&cleaned) {
        return DerivedTicker {
            ticker: format!("{cleaned}.NS"),
            exchange: Exchange::Nse,
        };
    }
    if NUMERIC_TICKER.is_match(&cleaned) {
        return DerivedTicker {
            ticker: format!("{cleaned}.BO"),
            exchange: Exchange::Bse,
        };
    }

    DerivedTicker::unknown()
}

fn derive_ticker_code(code: f64) -> DerivedTicker {
    // Anything outside this range cannot be a 4-6 digit scrip code anyway.
    if !code.is_finite() || code.abs() >= 1e7 {
        return DerivedTicker::unknown();
    }
    let code = format!("{}", code.trunc() as i64);
    if NUMERIC_TICKER.is_match(&code) {
        DerivedTicker {
            ticker: format!("{code}.BO"),
            exchange: Exchange::Bse,
        }
    } else {
        DerivedTicker::unknown()
    }
}

/// Exchange for an already qualified ticker such as `ABC.NS` or `532174.BO`.
fn qualified_exchange(cleaned: &str) -> Option<Exchange> {
    let (base, exchange) = if let Some(base) = cleaned.strip_suffix(".NS") {
        (base, Exchange::Nse)
    } else if let Some(base) = cleaned.strip_suffix(".BO") {
        (base, Exchange::Bse)
    } else {
        return None;
    };

    if base.is_empty() || base.chars().any(char::is_whitespace) {
        return None;
    }
    Some(exchange)
}

/// The ticker without its exchange suffix.
pub fn ticker_base(ticker: &str) -> &str {
    ticker.split('.').next().unwrap_or(ticker)
}

/// True for well-known large caps, matched on the ticker base or anywhere in the name.
pub fn is_popular(ticker: &str, name: &str) -> bool {
    let base = ticker_base(ticker).to_uppercase();
    if POPULAR_BASES.contains(&base.as_str()) {
        return true;
    }
    let name = name.to_uppercase();
    POPULAR_BASES.iter().any(|symbol| name.contains(symbol))
}
