pub mod google_finance;
pub mod market_data;
pub mod util;
pub mod yahoo_finance;

pub use market_data::{FetchOptions, MarketDataFetcher};
