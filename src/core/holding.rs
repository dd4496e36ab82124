//! Portfolio data model shared by the pipeline and the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::core::analytics;

/// Exchange a ticker is listed on, derived from its suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exchange {
    Nse,
    Bse,
    Unknown,
}

impl Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Exchange::Nse => "NSE",
                Exchange::Bse => "BSE",
                Exchange::Unknown => "UNKNOWN",
            }
        )
    }
}

/// A holding as read from the input file, before any market data is attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingBase {
    pub name: String,
    pub ticker: String,
    pub exchange: Exchange,
    pub sector: String,
    pub purchase_price: f64,
    pub quantity: f64,
}

/// Live values for a ticker. `None` means the value could not be obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LiveMetrics {
    pub cmp: Option<f64>,
    #[serde(rename = "peTTM")]
    pub pe_ttm: Option<f64>,
    #[serde(rename = "latestEps")]
    pub latest_eps: Option<f64>,
}

/// A holding with live metrics and the values derived from them.
///
/// The derived fields are only ever computed by [`HoldingWithLive::derive`], so they
/// cannot drift from the base and live data they were computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingWithLive {
    #[serde(flatten)]
    base: HoldingBase,
    #[serde(flatten)]
    live: LiveMetrics,
    investment: f64,
    present_value: f64,
    gain_loss: f64,
    portfolio_percent: f64,
}

impl HoldingWithLive {
    pub fn derive(base: HoldingBase, live: LiveMetrics, total_investment: f64) -> Self {
        let investment = analytics::calculate_investment(base.purchase_price, base.quantity);
        let present_value = analytics::calculate_present_value(live.cmp, base.quantity);
        let gain_loss = analytics::calculate_gain_loss(present_value, investment);
        let portfolio_percent =
            analytics::calculate_portfolio_percentage(investment, total_investment);

        Self {
            base,
            live,
            investment,
            present_value,
            gain_loss,
            portfolio_percent,
        }
    }

    pub fn base(&self) -> &HoldingBase {
        &self.base
    }

    pub fn live(&self) -> &LiveMetrics {
        &self.live
    }

    pub fn name(&self) -> &str {
        &self.base.name
    }

    pub fn ticker(&self) -> &str {
        &self.base.ticker
    }

    pub fn sector(&self) -> &str {
        &self.base.sector
    }

    pub fn investment(&self) -> f64 {
        self.investment
    }

    pub fn present_value(&self) -> f64 {
        self.present_value
    }

    pub fn gain_loss(&self) -> f64 {
        self.gain_loss
    }

    pub fn portfolio_percent(&self) -> f64 {
        self.portfolio_percent
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorGroupTotals {
    pub sector: String,
    pub total_investment: f64,
    pub total_present_value: f64,
    pub total_gain_loss: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioTotals {
    pub total_investment: f64,
    pub total_present_value: f64,
    pub total_gain_loss: f64,
}

/// A complete snapshot of the portfolio as served to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioResponse {
    pub last_updated: DateTime<Utc>,
    pub holdings: Vec<HoldingWithLive>,
    pub sectors: Vec<SectorGroupTotals>,
    pub totals: PortfolioTotals,
    pub used_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
}

impl PortfolioResponse {
    /// Restricts the holdings list to one page. Totals keep covering every holding.
    pub fn paginate(mut self, page: usize, limit: usize) -> Self {
        let total_count = self.holdings.len();
        let start = page.saturating_sub(1).saturating_mul(limit).min(total_count);
        let end = start.saturating_add(limit).min(total_count);
        self.holdings = self.holdings.drain(start..end).collect();
        self.page = Some(page);
        self.limit = Some(limit);
        self.total_count = Some(total_count);
        self
    }
}
