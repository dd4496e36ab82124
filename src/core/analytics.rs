//! Provides functions for deriving financial values from holdings and live prices.
use crate::core::holding::{HoldingBase, HoldingWithLive, LiveMetrics};
use crate::core::price::Fundamentals;
use std::collections::HashMap;
use tracing::debug;

/// Amount invested in a holding. Negative inputs are clamped to zero.
pub fn calculate_investment(price: f64, quantity: f64) -> f64 {
    price.max(0.0) * quantity.max(0.0)
}

/// Market value of a holding. A missing price counts as zero.
pub fn calculate_present_value(cmp: Option<f64>, quantity: f64) -> f64 {
    cmp.unwrap_or(0.0) * quantity.max(0.0)
}

pub fn calculate_gain_loss(present_value: f64, investment: f64) -> f64 {
    present_value - investment
}

/// Share of the total investment, as a percentage in `0..=100`.
pub fn calculate_portfolio_percentage(investment: f64, total_investment: f64) -> f64 {
    if total_investment > 0.0 {
        investment / total_investment * 100.0
    } else {
        0.0
    }
}

pub fn total_investment(holdings: &[HoldingBase]) -> f64 {
    holdings
        .iter()
        .map(|h| calculate_investment(h.purchase_price, h.quantity))
        .sum()
}

/// Joins each holding with its live price and fundamentals and computes the derived fields.
///
/// Tickers absent from either map get `None` for the corresponding live values.
pub fn derive_holdings(
    holdings: Vec<HoldingBase>,
    prices: &HashMap<String, Option<f64>>,
    fundamentals: &HashMap<String, Fundamentals>,
) -> Vec<HoldingWithLive> {
    let total = total_investment(&holdings);
    debug!(count = holdings.len(), total, "Deriving holdings");

    holdings
        .into_iter()
        .map(|base| {
            let cmp = prices.get(&base.ticker).copied().flatten();
            let fundamentals = fundamentals.get(&base.ticker).copied().unwrap_or_default();
            let live = LiveMetrics {
                cmp,
                pe_ttm: fundamentals.pe_ttm,
                latest_eps: fundamentals.latest_eps,
            };
            HoldingWithLive::derive(base, live, total)
        })
        .collect()
}
