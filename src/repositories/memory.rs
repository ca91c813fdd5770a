//! In-memory repositories for local runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CartRepository, ProductRepository, UserRepository};
use crate::models::{Cart, Product, RepositoryError, RepositoryResult, User};

/// Cart store keyed by owning user.
#[derive(Default)]
pub struct InMemoryCartRepository {
    carts: RwLock<HashMap<String, Cart>>,
    saves: RwLock<usize>,
    fail_on_find: RwLock<bool>,
    fail_on_save: RwLock<bool>,
}

impl InMemoryCartRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_find(&self, fail: bool) {
        *self.fail_on_find.write().await = fail;
    }

    pub async fn set_fail_on_save(&self, fail: bool) {
        *self.fail_on_save.write().await = fail;
    }

    /// Number of successful saves since creation
    pub async fn save_count(&self) -> usize {
        *self.saves.read().await
    }

    pub async fn cart_count(&self) -> usize {
        self.carts.read().await.len()
    }
}

#[async_trait]
impl CartRepository for InMemoryCartRepository {
    async fn find_by_user(&self, user_id: &str) -> RepositoryResult<Option<Cart>> {
        if *self.fail_on_find.read().await {
            return Err(RepositoryError::ConnectionFailed);
        }
        Ok(self.carts.read().await.get(user_id).cloned())
    }

    async fn save(&self, cart: Cart) -> RepositoryResult<Cart> {
        if *self.fail_on_save.read().await {
            return Err(RepositoryError::ConnectionFailed);
        }
        self.carts
            .write()
            .await
            .insert(cart.user().to_string(), cart.clone());
        *self.saves.write().await += 1;
        Ok(cart)
    }
}

/// User store. Unknown users are rejected unless the store is permissive.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
    permissive: bool,
    fail_on_set_cart: RwLock<bool>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that registers any user id it is asked about
    pub fn permissive() -> Self {
        Self {
            permissive: true,
            ..Self::default()
        }
    }

    pub fn with_users<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let users = ids
            .into_iter()
            .map(|id| {
                let user = User::new(id);
                (user.id.clone(), user)
            })
            .collect();
        Self {
            users: RwLock::new(users),
            ..Self::default()
        }
    }

    /// The cart a user record points at, if the user exists
    pub async fn cart_ref(&self, user_id: &str) -> Option<String> {
        self.users
            .read()
            .await
            .get(user_id)
            .and_then(|user| user.cart.clone())
    }

    pub async fn set_fail_on_set_cart(&self, fail: bool) {
        *self.fail_on_set_cart.write().await = fail;
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn set_cart(&self, user_id: &str, cart_id: &str) -> RepositoryResult<()> {
        if *self.fail_on_set_cart.read().await {
            return Err(RepositoryError::ConnectionFailed);
        }

        let mut users = self.users.write().await;
        if self.permissive && !users.contains_key(user_id) {
            users.insert(user_id.to_string(), User::new(user_id));
        }

        match users.get_mut(user_id) {
            Some(user) => {
                user.link_cart(cart_id);
                Ok(())
            }
            None => Err(RepositoryError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            }),
        }
    }
}

/// Read-only product catalog.
#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<String, Product>>,
    fail_on_find: RwLock<bool>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: RwLock::new(products.into_iter().map(|p| (p.id.clone(), p)).collect()),
            ..Self::default()
        }
    }

    pub async fn set_fail_on_find(&self, fail: bool) {
        *self.fail_on_find.write().await = fail;
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<HashMap<String, Product>> {
        if *self.fail_on_find.read().await {
            return Err(RepositoryError::ConnectionFailed);
        }
        let products = self.products.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| products.get(id).map(|p| (id.clone(), p.clone())))
            .collect())
    }
}
