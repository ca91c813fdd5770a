use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, KeysAndAttributes};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, instrument, warn, Instrument};

use super::dynamodb::{get_string, sdk_error, TableContext};
use crate::models::{Product, RepositoryError, RepositoryResult};
use crate::observability::DatabaseTracingMiddleware;

/// BatchGetItem accepts at most this many keys per request
const BATCH_GET_LIMIT: usize = 100;
const MAX_UNPROCESSED_RETRIES: usize = 3;

/// Read-only access to catalog products
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Look up products by id. Ids with no matching product are absent from the result.
    async fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<HashMap<String, Product>>;
}

pub struct DynamoDbProductRepository {
    client: Arc<DynamoDbClient>,
    ctx: TableContext,
}

impl DynamoDbProductRepository {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            client,
            ctx: TableContext::new(table_name, region),
        }
    }

    pub fn with_tracing(mut self, tracing: DatabaseTracingMiddleware) -> Self {
        self.ctx.tracing = Some(tracing);
        self
    }

    /// Convert a DynamoDB item to a Product
    pub fn item_to_product(
        &self,
        item: &HashMap<String, AttributeValue>,
    ) -> RepositoryResult<Product> {
        let optional = |key: &str| item.get(key).and_then(|v| v.as_s().ok()).cloned();

        let price = item
            .get("price")
            .and_then(|v| v.as_n().ok())
            .and_then(|s| Decimal::from_str(s).ok())
            .ok_or_else(|| RepositoryError::InvalidData {
                message: "Invalid price in product".to_string(),
            })?;

        Ok(Product {
            id: get_string(item, "product_id")?,
            name: get_string(item, "name")?,
            image: optional("image").unwrap_or_default(),
            description: optional("description").unwrap_or_default(),
            brand: optional("brand"),
            category: optional("category"),
            price,
            count_in_stock: item
                .get("count_in_stock")
                .and_then(|v| v.as_n().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        })
    }

    async fn batch_get(
        &self,
        ids: &[String],
    ) -> RepositoryResult<Vec<HashMap<String, AttributeValue>>> {
        let keys = ids
            .iter()
            .map(|id| HashMap::from([("product_id".to_string(), AttributeValue::S(id.clone()))]))
            .collect::<Vec<_>>();

        let mut request = KeysAndAttributes::builder()
            .set_keys(Some(keys))
            .build()
            .map_err(|e| RepositoryError::InvalidData {
                message: e.to_string(),
            })?;

        let mut found = Vec::new();
        for attempt in 0..=MAX_UNPROCESSED_RETRIES {
            let response = self
                .client
                .batch_get_item()
                .request_items(&self.ctx.table_name, request)
                .send()
                .await
                .map_err(|e| sdk_error(&self.ctx.table_name, e))?;

            if let Some(items) = response
                .responses()
                .and_then(|responses| responses.get(&self.ctx.table_name))
            {
                found.extend(items.iter().cloned());
            }

            match response
                .unprocessed_keys()
                .and_then(|unprocessed| unprocessed.get(&self.ctx.table_name))
            {
                Some(pending) if !pending.keys().is_empty() => {
                    debug!(attempt, pending = pending.keys().len(), "Retrying unprocessed keys");
                    request = pending.clone();
                }
                _ => return Ok(found),
            }
        }

        warn!("Products still unprocessed after retries, leaving them unresolved");
        Ok(found)
    }
}

#[async_trait]
impl ProductRepository for DynamoDbProductRepository {
    #[instrument(skip(self, ids), fields(table = %self.ctx.table_name, requested = ids.len()))]
    async fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<HashMap<String, Product>> {
        let mut unique: Vec<String> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(id) {
                unique.push(id.clone());
            }
        }

        let mut products = HashMap::with_capacity(unique.len());
        for chunk in unique.chunks(BATCH_GET_LIMIT) {
            let span = self.ctx.span("BatchGetItem");
            let items = self
                .ctx
                .traced("BatchGetItem", self.batch_get(chunk))
                .instrument(span)
                .await?;

            for item in &items {
                match self.item_to_product(item) {
                    Ok(product) => {
                        products.insert(product.id.clone(), product);
                    }
                    Err(e) => warn!("Skipping unreadable product: {}", e),
                }
            }
        }

        debug!(found = products.len(), "Products resolved");
        Ok(products)
    }
}
