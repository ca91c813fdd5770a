use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::handlers::{
    cors_middleware, create_cart_router, health_check, metrics_handler,
    request_validation_middleware, security_headers_middleware,
};
use crate::observability::{observability_middleware, Metrics};
use crate::services::CartService;

/// Build the HTTP application.
///
/// Cart routes are served both at the root and under `/api`.
pub fn create_app(
    metrics: Arc<Metrics>,
    cart_service: Arc<CartService>,
    server: &ServerConfig,
) -> Router {
    let metrics_for_middleware = metrics.clone();
    let max_request_size = server.max_request_size;
    let cart_router = create_cart_router(cart_service);

    Router::new()
        .route("/health/status", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
        .merge(cart_router.clone())
        .nest("/api", cart_router)
        // Outermost layer is added last
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(cors_middleware))
        .layer(middleware::from_fn(move |req, next| {
            request_validation_middleware(max_request_size, req, next)
        }))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::Repositories;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_seconds: 5,
            max_request_size: 1024,
        };
        let service = CartService::from_repositories(Repositories::in_memory());
        create_app(Arc::new(Metrics::new().unwrap()), Arc::new(service), &server)
    }

    #[tokio::test]
    async fn test_health_route_has_security_headers() {
        let response = app()
            .oneshot(Request::get("/health/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn test_cart_routes_mounted_twice() {
        for uri in ["/cart", "/api/cart"] {
            let response = app()
                .oneshot(
                    Request::get(uri)
                        .header("X-User-ID", "user123")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let response = app()
            .oneshot(
                Request::post("/cart")
                    .header("X-User-ID", "user123")
                    .header("content-type", "application/json")
                    .header("content-length", "4096")
                    .body(Body::from(vec![b' '; 4096]))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_metrics_route_reports_requests() {
        let app = app();
        app.clone()
            .oneshot(Request::get("/health/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("http_requests_total"));
    }
}
