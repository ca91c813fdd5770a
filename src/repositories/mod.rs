// Repositories module - data access layer

pub mod cart_repository;
mod dynamodb;
pub mod memory;
pub mod product_repository;
pub mod table_manager;
pub mod user_repository;

use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;

pub use cart_repository::{CartRepository, DynamoDbCartRepository};
pub use memory::{InMemoryCartRepository, InMemoryProductRepository, InMemoryUserRepository};
pub use product_repository::{DynamoDbProductRepository, ProductRepository};
pub use table_manager::TableManager;
pub use user_repository::{DynamoDbUserRepository, UserRepository};

use crate::config::DatabaseConfig;
use crate::observability::DatabaseTracingMiddleware;

/// The three stores the cart service reads and writes
#[derive(Clone)]
pub struct Repositories {
    pub carts: Arc<dyn CartRepository>,
    pub users: Arc<dyn UserRepository>,
    pub products: Arc<dyn ProductRepository>,
}

impl Repositories {
    /// Empty in-memory stores that accept any user id
    pub fn in_memory() -> Self {
        Self {
            carts: Arc::new(InMemoryCartRepository::new()),
            users: Arc::new(InMemoryUserRepository::permissive()),
            products: Arc::new(InMemoryProductRepository::new()),
        }
    }

    /// DynamoDB-backed stores sharing one client
    pub fn dynamodb(
        client: Arc<DynamoDbClient>,
        database: &DatabaseConfig,
        region: &str,
        tracing: DatabaseTracingMiddleware,
    ) -> Self {
        Self {
            carts: Arc::new(
                DynamoDbCartRepository::new(
                    client.clone(),
                    database.carts_table_name.clone(),
                    region.to_string(),
                )
                .with_tracing(tracing.clone()),
            ),
            users: Arc::new(
                DynamoDbUserRepository::new(
                    client.clone(),
                    database.users_table_name.clone(),
                    region.to_string(),
                )
                .with_tracing(tracing.clone()),
            ),
            products: Arc::new(
                DynamoDbProductRepository::new(
                    client,
                    database.products_table_name.clone(),
                    region.to_string(),
                )
                .with_tracing(tracing),
            ),
        }
    }
}
