use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use super::dynamodb::sdk_error;
use crate::models::{RepositoryError, RepositoryResult};

/// Hash key attribute of each table
pub const CARTS_KEY: &str = "user_id";
pub const USERS_KEY: &str = "user_id";
pub const PRODUCTS_KEY: &str = "product_id";

/// Manages DynamoDB table creation for local and test environments
pub struct TableManager {
    client: Arc<DynamoDbClient>,
    poll_interval: Duration,
    max_attempts: u32,
}

impl TableManager {
    pub fn new(client: Arc<DynamoDbClient>) -> Self {
        Self {
            client,
            // 5 minutes with 10-second intervals
            poll_interval: Duration::from_secs(10),
            max_attempts: 30,
        }
    }

    /// Create a pay-per-request table with a single string hash key
    #[instrument(skip(self), fields(table_name = %table_name, key = %key))]
    pub async fn create_hash_key_table(&self, table_name: &str, key: &str) -> RepositoryResult<()> {
        if self.table_exists(table_name).await? {
            info!("Table {} already exists", table_name);
            return Ok(());
        }

        let attribute_definition = AttributeDefinition::builder()
            .attribute_name(key)
            .attribute_type(ScalarAttributeType::S)
            .build()
            .map_err(|e| RepositoryError::AwsSdk {
                message: format!("Failed to build attribute definition: {}", e),
            })?;

        let key_schema = KeySchemaElement::builder()
            .attribute_name(key)
            .key_type(KeyType::Hash)
            .build()
            .map_err(|e| RepositoryError::AwsSdk {
                message: format!("Failed to build key schema: {}", e),
            })?;

        self.client
            .create_table()
            .table_name(table_name)
            .attribute_definitions(attribute_definition)
            .key_schema(key_schema)
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(|e| sdk_error(table_name, e))?;

        info!("Table creation initiated, waiting for table to become active");
        self.wait_for_table_active(table_name).await?;
        info!("Table {} created", table_name);

        Ok(())
    }

    /// Check if a table exists
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn table_exists(&self, table_name: &str) -> RepositoryResult<bool> {
        match self.client.describe_table().table_name(table_name).send().await {
            Ok(_) => Ok(true),
            Err(e)
                if e.as_service_error()
                    .map(|se| se.is_resource_not_found_exception())
                    .unwrap_or(false) =>
            {
                info!("Table {} does not exist", table_name);
                Ok(false)
            }
            Err(e) => {
                error!("Error checking table existence: {}", e);
                Err(RepositoryError::ConnectionFailed)
            }
        }
    }

    #[instrument(skip(self), fields(table_name = %table_name))]
    async fn wait_for_table_active(&self, table_name: &str) -> RepositoryResult<()> {
        let mut attempts = 0;

        loop {
            let response = self
                .client
                .describe_table()
                .table_name(table_name)
                .send()
                .await
                .map_err(|e| sdk_error(table_name, e))?;

            match response.table.and_then(|table| table.table_status) {
                Some(TableStatus::Active) => {
                    info!("Table {} is now active", table_name);
                    return Ok(());
                }
                Some(status) => info!("Table {} status: {:?}, waiting...", table_name, status),
                None => warn!("Table {} status unknown, waiting...", table_name),
            }

            attempts += 1;
            if attempts >= self.max_attempts {
                error!("Timeout waiting for table {} to become active", table_name);
                return Err(RepositoryError::Timeout);
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Create the carts, users and products tables
    #[instrument(skip(self))]
    pub async fn create_all_tables(
        &self,
        carts_table: &str,
        users_table: &str,
        products_table: &str,
    ) -> RepositoryResult<()> {
        let (carts, users, products) = tokio::join!(
            self.create_hash_key_table(carts_table, CARTS_KEY),
            self.create_hash_key_table(users_table, USERS_KEY),
            self.create_hash_key_table(products_table, PRODUCTS_KEY),
        );

        carts?;
        users?;
        products?;

        info!("All tables ready");
        Ok(())
    }
}
