use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, Instrument};

use super::dynamodb::{get_string, get_timestamp, sdk_error, TableContext};
use crate::models::{Cart, CartItem, RepositoryError, RepositoryResult};
use crate::observability::DatabaseTracingMiddleware;

/// Trait defining the interface for cart data access operations
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Find the cart owned by a user
    async fn find_by_user(&self, user_id: &str) -> RepositoryResult<Option<Cart>>;

    /// Persist the whole cart, creating or overwriting it
    async fn save(&self, cart: Cart) -> RepositoryResult<Cart>;
}

/// DynamoDB implementation of the CartRepository trait.
///
/// The table is keyed by `user_id`, so a user can own at most one cart.
pub struct DynamoDbCartRepository {
    client: Arc<DynamoDbClient>,
    ctx: TableContext,
}

impl DynamoDbCartRepository {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            client,
            ctx: TableContext::new(table_name, region),
        }
    }

    /// Record every table call in the database metrics
    pub fn with_tracing(mut self, tracing: DatabaseTracingMiddleware) -> Self {
        self.ctx.tracing = Some(tracing);
        self
    }

    pub fn table_name(&self) -> &str {
        &self.ctx.table_name
    }

    /// Convert a Cart to DynamoDB attribute values
    pub fn cart_to_item(&self, cart: &Cart) -> HashMap<String, AttributeValue> {
        let mut item = HashMap::new();

        item.insert(
            "user_id".to_string(),
            AttributeValue::S(cart.user().to_string()),
        );
        item.insert(
            "cart_id".to_string(),
            AttributeValue::S(cart.id().to_string()),
        );

        let items: Vec<AttributeValue> = cart
            .items()
            .iter()
            .map(|cart_item| {
                let mut item_map = HashMap::new();
                item_map.insert(
                    "product".to_string(),
                    AttributeValue::S(cart_item.product.clone()),
                );
                item_map.insert(
                    "name".to_string(),
                    AttributeValue::S(cart_item.name.clone()),
                );
                item_map.insert(
                    "price".to_string(),
                    AttributeValue::N(cart_item.price.to_string()),
                );
                item_map.insert(
                    "image".to_string(),
                    AttributeValue::S(cart_item.image.clone()),
                );
                item_map.insert(
                    "qty".to_string(),
                    AttributeValue::N(cart_item.qty.to_string()),
                );
                AttributeValue::M(item_map)
            })
            .collect();

        item.insert("items".to_string(), AttributeValue::L(items));
        item.insert(
            "created_at".to_string(),
            AttributeValue::S(cart.created_at().to_rfc3339()),
        );
        item.insert(
            "updated_at".to_string(),
            AttributeValue::S(cart.updated_at().to_rfc3339()),
        );

        item
    }

    /// Convert a DynamoDB item to a Cart
    pub fn item_to_cart(&self, item: HashMap<String, AttributeValue>) -> RepositoryResult<Cart> {
        let user = get_string(&item, "user_id")?;
        let id = get_string(&item, "cart_id")?;

        let items = match item.get("items").and_then(|v| v.as_l().ok()) {
            Some(list) => list
                .iter()
                .map(|attr| {
                    attr.as_m()
                        .map_err(|_| RepositoryError::InvalidData {
                            message: "Cart item is not a map".to_string(),
                        })
                        .and_then(|m| self.map_to_cart_item(m))
                })
                .collect::<RepositoryResult<Vec<_>>>()?,
            None => Vec::new(),
        };

        let created_at =
            get_timestamp(&item, "created_at").ok_or_else(|| RepositoryError::InvalidData {
                message: "Invalid created_at".to_string(),
            })?;

        // Legacy rows may lack updated_at
        let updated_at = get_timestamp(&item, "updated_at").unwrap_or(created_at);

        Ok(Cart::from_parts(id, user, items, created_at, updated_at))
    }

    /// Convert a DynamoDB map to a CartItem
    pub fn map_to_cart_item(
        &self,
        item_map: &HashMap<String, AttributeValue>,
    ) -> RepositoryResult<CartItem> {
        let product = get_string(item_map, "product")?;
        let name = get_string(item_map, "name")?;
        let image = get_string(item_map, "image")?;

        let price = item_map
            .get("price")
            .and_then(|v| v.as_n().ok())
            .and_then(|s| Decimal::from_str(s).ok())
            .ok_or_else(|| RepositoryError::InvalidData {
                message: "Invalid price in cart item".to_string(),
            })?;

        let qty = item_map
            .get("qty")
            .and_then(|v| v.as_n().ok())
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| RepositoryError::InvalidData {
                message: "Invalid qty in cart item".to_string(),
            })?;

        Ok(CartItem {
            product,
            name,
            price,
            image,
            qty,
        })
    }
}

#[async_trait]
impl CartRepository for DynamoDbCartRepository {
    #[instrument(skip(self), fields(table = %self.ctx.table_name, user_id = %user_id))]
    async fn find_by_user(&self, user_id: &str) -> RepositoryResult<Option<Cart>> {
        let span = self.ctx.span("GetItem");

        let response = self
            .ctx
            .traced("GetItem", async {
                self.client
                    .get_item()
                    .table_name(&self.ctx.table_name)
                    .key("user_id", AttributeValue::S(user_id.to_string()))
                    .send()
                    .await
                    .map_err(|e| sdk_error(&self.ctx.table_name, e))
            })
            .instrument(span)
            .await?;

        match response.item {
            Some(item) => {
                let cart = self.item_to_cart(item)?;
                info!(item_count = cart.items().len(), "Cart found");
                Ok(Some(cart))
            }
            None => {
                info!("Cart not found");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, cart), fields(table = %self.ctx.table_name, user_id = %cart.user(), item_count = cart.items().len()))]
    async fn save(&self, cart: Cart) -> RepositoryResult<Cart> {
        let item = self.cart_to_item(&cart);
        let span = self.ctx.span("PutItem");

        self.ctx
            .traced("PutItem", async {
                self.client
                    .put_item()
                    .table_name(&self.ctx.table_name)
                    .set_item(Some(item))
                    .send()
                    .await
                    .map_err(|e| sdk_error(&self.ctx.table_name, e))
            })
            .instrument(span)
            .await?;

        info!("Cart saved");
        Ok(cart)
    }
}
