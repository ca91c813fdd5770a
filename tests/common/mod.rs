use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use rust_decimal_macros::dec;
use serde_json::Value;
use tokio::net::TcpListener;

use cart_rs::{
    config::ServerConfig,
    create_app,
    models::Product,
    observability::Metrics,
    repositories::{InMemoryCartRepository, InMemoryProductRepository, InMemoryUserRepository},
    services::CartService,
};

pub const TEST_USER: &str = "user123";

/// A running server over in-memory stores, plus handles to those stores
pub struct TestEnvironment {
    pub client: Client,
    pub base_url: String,
    pub carts: Arc<InMemoryCartRepository>,
    pub users: Arc<InMemoryUserRepository>,
    pub products: Arc<InMemoryProductRepository>,
}

impl TestEnvironment {
    pub async fn new() -> Self {
        Self::with_users([TEST_USER]).await
    }

    /// Start a server that only knows the given user ids
    pub async fn with_users<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let carts = Arc::new(InMemoryCartRepository::new());
        let users = Arc::new(InMemoryUserRepository::with_users(users));
        let products = Arc::new(InMemoryProductRepository::with_products(catalog()));

        let service = CartService::new(carts.clone(), users.clone(), products.clone());
        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_seconds: 5,
            max_request_size: 64 * 1024,
        };
        let metrics = Arc::new(Metrics::new().expect("Failed to create metrics"));
        let app = create_app(metrics, Arc::new(service), &server);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Failed to serve app");
        });

        // Wait for server to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        Self {
            client: Client::new(),
            base_url,
            carts,
            users,
            products,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the identity header an upstream auth layer would set
    pub fn as_user(&self, builder: RequestBuilder, user_id: &str) -> RequestBuilder {
        builder.header("X-User-ID", user_id)
    }

    pub async fn replace_items(&self, user_id: &str, items: Value) -> Response {
        self.as_user(self.client.post(self.url("/cart")), user_id)
            .json(&serde_json::json!({ "cartItems": items }))
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn get_cart(&self, user_id: &str) -> Response {
        self.as_user(self.client.get(self.url("/cart")), user_id)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn remove_item(&self, user_id: &str, product_id: &str) -> Response {
        self.as_user(
            self.client
                .delete(self.url(&format!("/cart/remove/{}", product_id))),
            user_id,
        )
        .send()
        .await
        .expect("Failed to send request")
    }

    pub async fn update_quantity(
        &self,
        user_id: &str,
        product_id: &str,
        qty: impl Into<Value>,
    ) -> Response {
        self.as_user(
            self.client.put(self.url(&format!("/cart/{}", product_id))),
            user_id,
        )
        .json(&serde_json::json!({ "qty": qty.into() }))
        .send()
        .await
        .expect("Failed to send request")
    }
}

pub fn catalog() -> Vec<Product> {
    vec![
        Product::new("P1", "Premium Puppy Food", "puppy-food.jpg", dec!(29.99)),
        Product::new("P2", "Kitten Wet Food", "kitten-food.jpg", dec!(1.99)),
        Product::new("P3", "Puppy Training Treats", "puppy-treats.jpg", dec!(12.99)),
    ]
}

pub fn item(product: &str, qty: i64) -> Value {
    serde_json::json!({
        "product": product,
        "name": format!("Item {}", product),
        "price": 10,
        "image": "i",
        "qty": qty,
    })
}
