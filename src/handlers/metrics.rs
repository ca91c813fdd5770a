use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::error;

use crate::observability::Metrics;

/// Prometheus scrape endpoint
pub async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Response {
    let body = match metrics.encode() {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "Metrics encoding failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response()
}
