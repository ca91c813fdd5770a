use prometheus::{
    core::Collector, Counter, CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts,
    Registry, TextEncoder,
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),
    #[error("Failed to encode metrics: {0}")]
    Encoding(String),
}

const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Prometheus metrics for the cart service.
///
/// Each instance owns its registry, so tests can create as many as they like.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub http_requests_in_flight: GaugeVec,

    pub database_operations_total: CounterVec,
    pub database_operation_duration_seconds: HistogramVec,

    /// Labelled by operation and outcome
    pub cart_operations_total: CounterVec,
    pub cart_items_rejected_total: Counter,
}

fn register<M>(registry: &Registry, metric: M) -> Result<M, MetricsError>
where
    M: Collector + Clone + 'static,
{
    registry.register(Box::new(metric.clone()))?;
    Ok(metric)
}

fn outcome(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "error"
    }
}

impl Metrics {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let metrics = Metrics {
            http_requests_total: register(
                &registry,
                CounterVec::new(
                    Opts::new("http_requests_total", "HTTP requests served"),
                    &["method", "endpoint", "status_code"],
                )?,
            )?,
            http_request_duration_seconds: register(
                &registry,
                HistogramVec::new(
                    HistogramOpts::new(
                        "http_request_duration_seconds",
                        "HTTP request latency in seconds",
                    )
                    .buckets(LATENCY_BUCKETS.to_vec()),
                    &["method", "endpoint"],
                )?,
            )?,
            http_requests_in_flight: register(
                &registry,
                GaugeVec::new(
                    Opts::new("http_requests_in_flight", "HTTP requests being handled"),
                    &["method", "endpoint"],
                )?,
            )?,
            database_operations_total: register(
                &registry,
                CounterVec::new(
                    Opts::new("database_operations_total", "Store calls by outcome"),
                    &["operation", "table", "status"],
                )?,
            )?,
            database_operation_duration_seconds: register(
                &registry,
                HistogramVec::new(
                    HistogramOpts::new(
                        "database_operation_duration_seconds",
                        "Store call latency in seconds",
                    )
                    .buckets(LATENCY_BUCKETS.to_vec()),
                    &["operation", "table"],
                )?,
            )?,
            cart_operations_total: register(
                &registry,
                CounterVec::new(
                    Opts::new("cart_operations_total", "Cart operations by outcome"),
                    &["operation", "status"],
                )?,
            )?,
            cart_items_rejected_total: register(
                &registry,
                Counter::new(
                    "cart_items_rejected_total",
                    "Submitted cart items dropped for a missing or empty field",
                )?,
            )?,
            registry,
        };

        info!("Prometheus metrics registered");
        Ok(metrics)
    }

    /// Encode all metrics in Prometheus text format
    pub fn encode(&self) -> Result<String, MetricsError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| MetricsError::Encoding(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }

    pub fn record_http_request(
        &self,
        method: &str,
        endpoint: &str,
        status_code: u16,
        duration_seconds: f64,
    ) {
        self.http_requests_total
            .with_label_values(&[method, endpoint, &status_code.to_string()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration_seconds);
    }

    pub fn record_database_operation(
        &self,
        operation: &str,
        table: &str,
        success: bool,
        duration_seconds: f64,
    ) {
        self.database_operations_total
            .with_label_values(&[operation, table, outcome(success)])
            .inc();
        self.database_operation_duration_seconds
            .with_label_values(&[operation, table])
            .observe(duration_seconds);
    }

    pub fn record_cart_operation(&self, operation: &str, success: bool) {
        self.cart_operations_total
            .with_label_values(&[operation, outcome(success)])
            .inc();
    }

    /// Count items dropped by the completeness filter
    pub fn record_rejected_cart_items(&self, count: usize) {
        self.cart_items_rejected_total.inc_by(count as f64);
    }

    pub fn increment_in_flight(&self, method: &str, endpoint: &str) {
        self.http_requests_in_flight
            .with_label_values(&[method, endpoint])
            .inc();
    }

    pub fn decrement_in_flight(&self, method: &str, endpoint: &str) {
        self.http_requests_in_flight
            .with_label_values(&[method, endpoint])
            .dec();
    }
}
