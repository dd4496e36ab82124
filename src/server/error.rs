use std::convert::Infallible;
use std::fmt;
use tracing::warn;
use warp::http::StatusCode;
use warp::reject::{InvalidQuery, MethodNotAllowed, Reject};
use warp::{Rejection, Reply};

/// A request that failed inside the service. It keeps the whole error chain so the client
/// sees the underlying cause, not just the step that failed.
#[derive(Debug)]
pub struct ApiError {
    context: &'static str,
    source: anyhow::Error,
}

impl ApiError {
    pub fn internal(context: &'static str, source: anyhow::Error) -> Self {
        ApiError { context, source }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {:#}", self.context, self.source)
    }
}

impl Reject for ApiError {}

/// Turns every rejection into a JSON `{"error": ...}` body.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(api_error) = err.find::<ApiError>() {
        (StatusCode::INTERNAL_SERVER_ERROR, api_error.to_string())
    } else if err.find::<InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query string".to_string())
    } else if err.find::<MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed".to_string())
    } else {
        warn!("Unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({ "error": message })),
        code,
    ))
}
