use serde::{Deserialize, Serialize};

/// The slice of a user record the cart service reads and writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    /// Id of the user's cart, set when the cart is first created
    #[serde(default)]
    pub cart: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cart: None,
        }
    }

    pub fn link_cart(&mut self, cart_id: impl Into<String>) {
        self.cart = Some(cart_id.into());
    }
}
