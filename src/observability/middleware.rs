use axum::{
    extract::{MatchedPath, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::{Status, TraceContextExt};
use std::{future::Future, sync::Arc, time::Instant};
use tracing::{debug, error, info, instrument, warn, Instrument, Span};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::Metrics;

/// Request span, structured access log and HTTP metrics for every route
pub async fn observability_middleware(
    metrics: Arc<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let user_agent = header_str(request.headers(), "user-agent")
        .unwrap_or("unknown")
        .to_string();
    let client_ip = client_ip(request.headers());
    // Bounded by the router's patterns, so the span name stays low-cardinality
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched_path| matched_path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let span_name = format!("{} {}", method, route);
    let span = tracing::info_span!(
        target: "cart_rs::http",
        "{}", span_name,
        otel.name = %span_name,
        otel.kind = "server",
        http.method = %method,
        http.route = %route,
        http.url = %request.uri(),
        http.user_agent = %user_agent,
        client.address = %client_ip,
        http.response.status_code = tracing::field::Empty,
        http.response_time_ms = tracing::field::Empty,
    );

    async {
        metrics.increment_in_flight(&method, &route);
        let response = next.run(request).await;
        metrics.decrement_in_flight(&method, &route);

        let elapsed = start_time.elapsed();
        let status_code = response.status().as_u16();
        metrics.record_http_request(&method, &route, status_code, elapsed.as_secs_f64());

        let span = Span::current();
        span.record("http.response.status_code", status_code);
        span.record("http.response_time_ms", elapsed.as_millis() as u64);

        let otel_context = span.context();
        let otel_span = otel_context.span();
        otel_span.set_status(if status_code >= 500 {
            Status::error("HTTP server error")
        } else {
            Status::Ok
        });

        let trace_id = otel_span.span_context().trace_id().to_string();
        let duration_ms = elapsed.as_millis() as u64;
        match status_code {
            500.. => error!(
                %trace_id, %method, path = %route, status_code, duration_ms, %client_ip,
                "Request failed"
            ),
            400..=499 => warn!(
                %trace_id, %method, path = %route, status_code, duration_ms, %client_ip,
                "Request rejected"
            ),
            _ => info!(
                %trace_id, %method, path = %route, status_code, duration_ms, %user_agent,
                "Request completed"
            ),
        }

        response
    }
    .instrument(span)
    .await
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// First hop of X-Forwarded-For, then X-Real-IP
fn client_ip(headers: &HeaderMap) -> String {
    header_str(headers, "x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .or_else(|| header_str(headers, "x-real-ip"))
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

/// Await `future`, returning its result and how long it took
async fn timed<F, T, E>(future: F) -> (Result<T, E>, std::time::Duration)
where
    F: Future<Output = Result<T, E>>,
{
    let start_time = Instant::now();
    let result = future.await;
    (result, start_time.elapsed())
}

/// Times store calls and feeds the database metrics
#[derive(Clone)]
pub struct DatabaseTracingMiddleware {
    metrics: Arc<Metrics>,
}

impl DatabaseTracingMiddleware {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }

    #[instrument(skip_all, fields(operation = %operation, table = %table))]
    pub async fn trace_operation<F, T, E>(
        &self,
        operation: &str,
        table: &str,
        future: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let (result, elapsed) = timed(future).await;
        self.metrics.record_database_operation(
            operation,
            table,
            result.is_ok(),
            elapsed.as_secs_f64(),
        );

        let duration_ms = elapsed.as_millis() as u64;
        match &result {
            Ok(_) => debug!(duration_ms, "Database operation completed"),
            Err(e) => error!(error = %e, duration_ms, "Database operation failed"),
        }
        result
    }
}

/// Counts cart operations by outcome and records dropped items
#[derive(Clone)]
pub struct BusinessTracingMiddleware {
    metrics: Arc<Metrics>,
}

impl BusinessTracingMiddleware {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }

    #[instrument(skip_all, fields(operation = %operation, user_id = user_id))]
    pub async fn trace_cart_operation<F, T, E>(
        &self,
        operation: &str,
        user_id: Option<&str>,
        future: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let (result, elapsed) = timed(future).await;
        self.metrics.record_cart_operation(operation, result.is_ok());

        let duration_ms = elapsed.as_millis() as u64;
        match &result {
            Ok(_) => info!(duration_ms, "Cart operation completed"),
            Err(e) => warn!(error = %e, duration_ms, "Cart operation failed"),
        }
        result
    }

    pub fn record_rejected_items(&self, count: usize) {
        self.metrics.record_rejected_cart_items(count);
    }
}
