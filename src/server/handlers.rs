use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info};
use warp::Rejection;
use warp::reply::Json;

use super::error::ApiError;
use crate::core::PortfolioService;
use crate::core::ticker::is_popular;

/// Query parameters accepted by the portfolio endpoint.
///
/// Values are kept as text so a malformed `page` disables pagination instead of rejecting
/// the request.
#[derive(Debug, Default, Deserialize)]
pub struct PortfolioQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub popular: Option<String>,
}

impl PortfolioQuery {
    fn pagination(&self) -> Option<(usize, usize)> {
        let page = positive(self.page.as_deref())?;
        let limit = positive(self.limit.as_deref())?;
        Some((page, limit))
    }

    fn popular_only(&self) -> bool {
        self.popular
            .as_deref()
            .is_some_and(|p| p.eq_ignore_ascii_case("true"))
    }
}

fn positive(value: Option<&str>) -> Option<usize> {
    value?.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

pub async fn get_portfolio(
    query: PortfolioQuery,
    service: PortfolioService,
) -> Result<Json, Rejection> {
    let mut response = match service.snapshot().await {
        Ok(response) => response,
        Err(e) => {
            error!("Failed to build portfolio: {e:#}");
            return Err(warp::reject::custom(ApiError::internal(
                "Failed to load portfolio data",
                e,
            )));
        }
    };

    if query.popular_only() {
        response
            .holdings
            .retain(|h| is_popular(h.ticker(), h.name()));
    }
    if let Some((page, limit)) = query.pagination() {
        response = response.paginate(page, limit);
    }

    info!(
        holdings = response.holdings.len(),
        used_cache = response.used_cache,
        "Serving portfolio"
    );
    Ok(warp::reply::json(&response))
}

pub async fn get_health() -> Result<Json, Rejection> {
    Ok(warp::reply::json(&serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
