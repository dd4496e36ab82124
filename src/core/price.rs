//! Market data abstractions and core types

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Trailing fundamentals for a ticker. Either field may be unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub pe_ttm: Option<f64>,
    pub latest_eps: Option<f64>,
}

/// A single upstream source of quotes.
///
/// `Err` means the call failed and may be retried. `Ok` with missing values means the
/// source answered but does not know the value, so the next source should be asked.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_price(&self, ticker: &str) -> Result<Option<f64>>;

    async fn fetch_fundamentals(&self, ticker: &str) -> Result<Fundamentals>;
}

/// Bulk market data lookup used by the portfolio pipeline.
///
/// Implementations never fail as a whole: tickers that cannot be resolved map to
/// missing values.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn fetch_prices(&self, tickers: &[String]) -> HashMap<String, Option<f64>>;

    async fn fetch_fundamentals(&self, tickers: &[String]) -> HashMap<String, Fundamentals>;
}

/// A value that can be filled in field by field from several sources.
pub trait Resolvable: Default + Send {
    /// True when no further source needs to be consulted.
    fn is_complete(&self) -> bool;

    /// Takes values from `other` only where `self` has none.
    fn fill_from(&mut self, other: Self);
}

impl Resolvable for Option<f64> {
    fn is_complete(&self) -> bool {
        self.is_some()
    }

    fn fill_from(&mut self, other: Self) {
        if self.is_none() {
            *self = other;
        }
    }
}

impl Resolvable for Fundamentals {
    fn is_complete(&self) -> bool {
        self.pe_ttm.is_some() && self.latest_eps.is_some()
    }

    fn fill_from(&mut self, other: Self) {
        self.pe_ttm = self.pe_ttm.or(other.pe_ttm);
        self.latest_eps = self.latest_eps.or(other.latest_eps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_fill_keeps_existing_value() {
        let mut price: Option<f64> = Some(10.0);
        price.fill_from(Some(20.0));
        assert_eq!(price, Some(10.0));

        let mut missing: Option<f64> = None;
        missing.fill_from(Some(20.0));
        assert_eq!(missing, Some(20.0));
        assert!(missing.is_complete());
    }

    #[test]
    fn test_fundamentals_fill_field_by_field() {
        let mut fundamentals = Fundamentals {
            pe_ttm: Some(12.0),
            latest_eps: None,
        };
        assert!(!fundamentals.is_complete());

        fundamentals.fill_from(Fundamentals {
            pe_ttm: Some(99.0),
            latest_eps: Some(3.5),
        });
        assert_eq!(fundamentals.pe_ttm, Some(12.0));
        assert_eq!(fundamentals.latest_eps, Some(3.5));
        assert!(fundamentals.is_complete());
    }
}
