//! Portfolio domain types and the pipeline that builds snapshots

pub mod allocation;
pub mod analytics;
pub mod cache;
pub mod config;
pub mod holding;
pub mod log;
pub mod normalize;
pub mod portfolio;
pub mod price;
pub mod source;
pub mod ticker;

// Re-export main types for cleaner imports
pub use holding::{HoldingBase, HoldingWithLive, PortfolioResponse};
pub use portfolio::PortfolioService;
pub use price::{Fundamentals, MarketData, QuoteProvider};
