use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use tracing::{info, instrument, warn, Instrument};

use super::dynamodb::{sdk_error, TableContext};
use crate::models::{RepositoryError, RepositoryResult};
use crate::observability::DatabaseTracingMiddleware;

/// Access to the user records a cart links back to
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Point a user's cart reference at `cart_id`.
    ///
    /// Fails with `NotFound` when the user does not exist.
    async fn set_cart(&self, user_id: &str, cart_id: &str) -> RepositoryResult<()>;
}

pub struct DynamoDbUserRepository {
    client: Arc<DynamoDbClient>,
    ctx: TableContext,
}

impl DynamoDbUserRepository {
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
}

#[async_trait]
impl UserRepository for DynamoDbUserRepository {
    #[instrument(skip(self), fields(table = %self.ctx.table_name, user_id = %user_id, cart_id = %cart_id))]
    async fn set_cart(&self, user_id: &str, cart_id: &str) -> RepositoryResult<()> {
        let span = self.ctx.span("UpdateItem");

        self.ctx
            .traced("UpdateItem", async {
                match self
                    .client
                    .update_item()
                    .table_name(&self.ctx.table_name)
                    .key("user_id", AttributeValue::S(user_id.to_string()))
                    .update_expression("SET cart_id = :cart_id")
                    .condition_expression("attribute_exists(user_id)")
                    .expression_attribute_values(":cart_id", AttributeValue::S(cart_id.to_string()))
                    .send()
                    .await
                {
                    Ok(_) => Ok(()),
                    Err(e)
                        if e.as_service_error()
                            .map(|se| se.is_conditional_check_failed_exception())
                            .unwrap_or(false) =>
                    {
                        warn!("User does not exist, cart link not written");
                        Err(RepositoryError::NotFound {
                            entity: "user",
                            id: user_id.to_string(),
                        })
                    }
                    Err(e) => Err(sdk_error(&self.ctx.table_name, e)),
                }
            })
            .instrument(span)
            .await?;

        info!("User linked to cart");
        Ok(())
    }
}

