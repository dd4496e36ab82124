use tracing::info;
use warp::reject::Rejection;
use warp::{Filter, Reply};

use super::error::handle_rejection;
use super::handlers::{PortfolioQuery, get_health, get_portfolio};
use crate::core::PortfolioService;

pub fn routes(
    service: PortfolioService,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    info!("Configuring routes...");

    let service_filter = warp::any().map(move || service.clone());

    let portfolio_route = warp::path!("api" / "portfolio")
        .and(warp::get())
        .and(warp::query::<PortfolioQuery>())
        .and(service_filter)
        .and_then(get_portfolio);

    let health_route = warp::path!("api" / "health")
        .and(warp::get())
        .and_then(get_health);

    // The dashboard may be served from another origin
    let cors = warp::cors()
        .allow_any_origin()
        .allow_header("content-type")
        .allow_methods(vec!["GET"]);

    portfolio_route
        .or(health_route)
        .recover(handle_rejection)
        .with(cors)
}
