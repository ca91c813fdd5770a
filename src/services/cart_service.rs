use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::UserLocks;
use crate::models::{
    coerce_quantity, retain_complete_items, validate_user_id, Cart, CartItem, CartItemCandidate,
    PopulatedCart, ServiceError, ServiceResult,
};
use crate::observability::BusinessTracingMiddleware;
use crate::repositories::{CartRepository, ProductRepository, Repositories, UserRepository};

/// Service reconciling a user's cart with incoming edits
pub struct CartService {
    cart_repository: Arc<dyn CartRepository>,
    user_repository: Arc<dyn UserRepository>,
    product_repository: Arc<dyn ProductRepository>,
    locks: UserLocks,
    tracing: Option<BusinessTracingMiddleware>,
}

impl CartService {
    pub fn new(
        cart_repository: Arc<dyn CartRepository>,
        user_repository: Arc<dyn UserRepository>,
        product_repository: Arc<dyn ProductRepository>,
    ) -> Self {
        Self {
            cart_repository,
            user_repository,
            product_repository,
            locks: UserLocks::new(),
            tracing: None,
        }
    }

    pub fn from_repositories(repositories: Repositories) -> Self {
        Self::new(
            repositories.carts,
            repositories.users,
            repositories.products,
        )
    }

    /// Record operations in the business metrics
    pub fn with_tracing(mut self, tracing: BusinessTracingMiddleware) -> Self {
        self.tracing = Some(tracing);
        self
    }

    /// Get a user's cart with product references expanded.
    ///
    /// Products that no longer exist are left as bare ids.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_cart(&self, user_id: &str) -> ServiceResult<PopulatedCart> {
        self.traced("get_cart", user_id, async {
            validate_user_id(user_id)?;

            let cart = self.load_cart_for_user(user_id).await?;
            let product_ids = cart.product_ids();

            let products = if product_ids.is_empty() {
                HashMap::new()
            } else {
                self.product_repository.find_by_ids(&product_ids).await?
            };

            let unresolved = product_ids
                .iter()
                .filter(|id| !products.contains_key(*id))
                .count();
            if unresolved > 0 {
                warn!(unresolved, "Cart references products that no longer exist");
            }

            info!(item_count = cart.items().len(), "Cart retrieved");
            Ok(PopulatedCart::from_cart(cart, &products))
        })
        .await
    }

    /// Replace the whole item list, creating the cart on first use.
    ///
    /// Incomplete candidates are dropped without surfacing an error to the caller.
    #[instrument(skip(self, candidates), fields(user_id = %user_id, submitted = candidates.len()))]
    pub async fn replace_items(
        &self,
        user_id: &str,
        candidates: Vec<CartItemCandidate>,
    ) -> ServiceResult<Cart> {
        self.traced("replace_items", user_id, async {
            validate_user_id(user_id)?;

            let filtered = retain_complete_items(candidates).map_err(ServiceError::uncastable)?;
            if filtered.rejected > 0 {
                warn!(
                    rejected = filtered.rejected,
                    accepted = filtered.accepted.len(),
                    "Dropped incomplete cart items"
                );
                if let Some(tracing) = &self.tracing {
                    tracing.record_rejected_items(filtered.rejected);
                }
            }

            let _guard = self.locks.acquire(user_id).await;

            match self.cart_repository.find_by_user(user_id).await? {
                Some(mut cart) => {
                    cart.replace_items(filtered.accepted);
                    let saved = self.cart_repository.save(cart).await?;
                    info!(cart_id = %saved.id(), item_count = saved.items().len(), "Cart items replaced");
                    Ok(saved)
                }
                None => {
                    let cart = Cart::new(user_id, filtered.accepted);
                    let saved = self.cart_repository.save(cart).await?;
                    // No rollback: a failure here leaves a cart the user record does not point at
                    self.user_repository.set_cart(user_id, saved.id()).await?;
                    info!(cart_id = %saved.id(), item_count = saved.items().len(), "Cart created");
                    Ok(saved)
                }
            }
        })
        .await
    }

    /// Remove every item referencing `product_id`
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn remove_item(&self, user_id: &str, product_id: &str) -> ServiceResult<Cart> {
        self.traced("remove_item", user_id, async {
            validate_user_id(user_id)?;
            let _guard = self.locks.acquire(user_id).await;

            let mut cart = self.load_cart_for_user(user_id).await?;
            let removed = cart.remove_product(product_id);

            let saved = self.cart_repository.save(cart).await?;
            info!(removed, "Cart item removed");
            Ok(saved)
        })
        .await
    }

    /// Set the quantity of the first item referencing `product_id`.
    ///
    /// `qty` is cast like a replacement item's quantity once the item is found.
    /// Zero and negative quantities are stored as given.
    #[instrument(skip(self, qty), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn update_item_quantity(
        &self,
        user_id: &str,
        product_id: &str,
        qty: impl Into<Value>,
    ) -> ServiceResult<CartItem> {
        let qty = qty.into();
        self.traced("update_item_quantity", user_id, async {
            validate_user_id(user_id)?;
            let _guard = self.locks.acquire(user_id).await;

            let mut cart = self.load_cart_for_user(user_id).await?;
            let item_not_found = || ServiceError::CartItemNotFound {
                product_id: product_id.to_string(),
                user_id: user_id.to_string(),
            };
            if !cart.contains_item(product_id) {
                return Err(item_not_found());
            }

            let qty = coerce_quantity(qty).map_err(ServiceError::uncastable)?;
            let item = cart
                .set_item_quantity(product_id, qty)
                .cloned()
                .ok_or_else(item_not_found)?;

            self.cart_repository.save(cart).await?;
            info!(qty, "Cart item quantity updated");
            Ok(item)
        })
        .await
    }

    async fn load_cart_for_user(&self, user_id: &str) -> ServiceResult<Cart> {
        self.cart_repository
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::CartNotFound {
                user_id: user_id.to_string(),
            })
    }

    async fn traced<F, T>(&self, operation: &str, user_id: &str, future: F) -> ServiceResult<T>
    where
        F: Future<Output = ServiceResult<T>>,
    {
        match &self.tracing {
            Some(tracing) => {
                tracing
                    .trace_cart_operation(operation, Some(user_id), future)
                    .await
            }
            None => future.await,
        }
    }
}
