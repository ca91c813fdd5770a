use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use super::Product;

/// Shopping cart for a user
///
/// The owning user is fixed at construction; there is no way to reassign it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(rename = "_id")]
    id: String,
    user: String,
    #[serde(rename = "cartItems")]
    items: Vec<CartItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Individual line in a shopping cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Referenced product id
    pub product: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub image: String,
    pub qty: i64,
}

/// An incoming cart item before the completeness filter.
///
/// Every field is optional and untyped; clients may send anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartItemCandidate {
    #[serde(default)]
    pub product: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub image: Option<Value>,
    #[serde(default)]
    pub qty: Option<Value>,
}

/// Request body for replacing the cart's item list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceCartItemsRequest {
    #[serde(rename = "cartItems")]
    pub cart_items: Vec<Value>,
}

/// Request body for updating a cart item's quantity.
///
/// `qty` is cast the same way as a replacement item's quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCartItemRequest {
    pub qty: Value,
}

/// Response body for a successful item-list replacement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceCartResponse {
    pub message: String,
    pub cart: Cart,
}

/// Cart with each item's product reference expanded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedCart {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: String,
    #[serde(rename = "cartItems")]
    pub items: Vec<PopulatedCartItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulatedCartItem {
    pub product: ProductRef,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub image: String,
    pub qty: i64,
}

/// A product reference: the full record when it resolved, the bare id otherwise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    Populated(Product),
    Unresolved(String),
}

impl Cart {
    /// Create a new cart for a user with a fresh id
    pub fn new(user: impl Into<String>, items: Vec<CartItem>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user: user.into(),
            items,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a cart from its stored fields
    pub fn from_parts(
        id: String,
        user: String,
        items: Vec<CartItem>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user,
            items,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Overwrite the whole item list. Quantities of items present before are not kept.
    pub fn replace_items(&mut self, items: Vec<CartItem>) {
        self.items = items;
        self.updated_at = Utc::now();
    }

    /// Remove every item referencing `product`, returning how many were removed
    pub fn remove_product(&mut self, product: &str) -> usize {
        let original_len = self.items.len();
        self.items.retain(|item| item.product != product);
        let removed = original_len - self.items.len();
        if removed > 0 {
            self.updated_at = Utc::now();
        }
        removed
    }

    /// Set the quantity of the first item referencing `product`
    pub fn set_item_quantity(&mut self, product: &str, qty: i64) -> Option<&CartItem> {
        let item = self.items.iter_mut().find(|item| item.product == product)?;
        item.qty = qty;
        self.updated_at = Utc::now();
        Some(item)
    }

    /// Get the first item referencing `product`
    pub fn get_item(&self, product: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product == product)
    }

    pub fn contains_item(&self, product: &str) -> bool {
        self.items.iter().any(|item| item.product == product)
    }

    /// Distinct product ids referenced by this cart, in first-seen order
    pub fn product_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            if !ids.contains(&item.product) {
                ids.push(item.product.clone());
            }
        }
        ids
    }
}

impl CartItem {
    pub fn new(
        product: impl Into<String>,
        name: impl Into<String>,
        price: Decimal,
        image: impl Into<String>,
        qty: i64,
    ) -> Self {
        Self {
            product: product.into(),
            name: name.into(),
            price,
            image: image.into(),
            qty,
        }
    }
}

impl CartItemCandidate {
    /// Read a candidate out of an arbitrary JSON value.
    ///
    /// Non-object values yield an empty candidate, which the completeness filter drops.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
            _ => Self::default(),
        }
    }
}

impl PopulatedCart {
    /// Expand item references using the products that resolved
    pub fn from_cart(cart: Cart, products: &HashMap<String, Product>) -> Self {
        let items = cart
            .items
            .into_iter()
            .map(|item| PopulatedCartItem {
                product: match products.get(&item.product) {
                    Some(product) => ProductRef::Populated(product.clone()),
                    None => ProductRef::Unresolved(item.product),
                },
                name: item.name,
                price: item.price,
                image: item.image,
                qty: item.qty,
            })
            .collect();

        Self {
            id: cart.id,
            user: cart.user,
            items,
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        }
    }

    /// Product id of an item whether or not it resolved
    pub fn product_id(item: &PopulatedCartItem) -> &str {
        match &item.product {
            ProductRef::Populated(product) => &product.id,
            ProductRef::Unresolved(id) => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn item(product: &str, qty: i64) -> CartItem {
        CartItem::new(product, format!("{product} name"), dec!(9.99), "img.jpg", qty)
    }

    #[test]
    fn test_cart_creation() {
        let cart = Cart::new("user123", vec![item("P1", 2)]);

        assert_eq!(cart.user(), "user123");
        assert_eq!(cart.items().len(), 1);
        assert!(!cart.id().is_empty());
        assert_eq!(cart.created_at(), cart.updated_at());
    }

    #[test]
    fn test_replace_items_discards_previous_quantities() {
        let mut cart = Cart::new("user123", vec![item("P1", 2), item("P2", 1)]);

        cart.replace_items(vec![item("P1", 1)]);

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.get_item("P1").map(|i| i.qty), Some(1));
        assert!(!cart.contains_item("P2"));
    }

    #[test]
    fn test_remove_product_removes_duplicates() {
        let mut cart = Cart::new("user123", vec![item("P1", 2), item("P3", 1), item("P1", 4)]);

        let removed = cart.remove_product("P1");

        assert_eq!(removed, 2);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].product, "P3");
    }

    #[test]
    fn test_remove_missing_product_is_noop() {
        let mut cart = Cart::new("user123", vec![item("P1", 2)]);
        let before = cart.updated_at();

        assert_eq!(cart.remove_product("P9"), 0);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.updated_at(), before);
    }

    #[test]
    fn test_set_item_quantity_first_match_only() {
        let mut cart = Cart::new("user123", vec![item("P1", 2), item("P1", 7)]);

        let updated = cart.set_item_quantity("P1", 5).cloned();

        assert_eq!(updated.map(|i| i.qty), Some(5));
        assert_eq!(cart.items()[0].qty, 5);
        assert_eq!(cart.items()[1].qty, 7);
    }

    #[test]
    fn test_set_item_quantity_accepts_non_positive() {
        let mut cart = Cart::new("user123", vec![item("P1", 2)]);

        assert_eq!(cart.set_item_quantity("P1", 0).map(|i| i.qty), Some(0));
        assert_eq!(cart.set_item_quantity("P1", -3).map(|i| i.qty), Some(-3));
        assert!(cart.set_item_quantity("P9", 1).is_none());
    }

    #[test]
    fn test_product_ids_are_distinct() {
        let cart = Cart::new("user123", vec![item("P2", 1), item("P1", 1), item("P2", 3)]);
        assert_eq!(cart.product_ids(), vec!["P2".to_string(), "P1".to_string()]);
    }

    #[test]
    fn test_cart_wire_format() {
        let cart = Cart::new("user123", vec![item("P1", 2)]);

        let json = serde_json::to_value(&cart).unwrap();

        assert_eq!(json["_id"], cart.id());
        assert_eq!(json["user"], "user123");
        assert_eq!(json["cartItems"][0]["product"], "P1");
        assert_eq!(json["cartItems"][0]["qty"], 2);
        assert_eq!(json["cartItems"][0]["price"], 9.99);
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
    }

    #[test]
    fn test_candidate_from_value() {
        let candidate = CartItemCandidate::from_value(json!({
            "product": "P1",
            "qty": 2,
            "color": "red"
        }));
        assert_eq!(candidate.product, Some(json!("P1")));
        assert_eq!(candidate.qty, Some(json!(2)));
        assert_eq!(candidate.name, None);

        assert_eq!(CartItemCandidate::from_value(json!(42)), CartItemCandidate::default());
        assert_eq!(CartItemCandidate::from_value(Value::Null), CartItemCandidate::default());
    }

    #[test]
    fn test_populated_cart_keeps_unresolved_ids() {
        let cart = Cart::new("user123", vec![item("P1", 2), item("P2", 1)]);
        let mut products = HashMap::new();
        products.insert(
            "P1".to_string(),
            Product::new("P1", "Kibble", "kibble.jpg", dec!(9.99)),
        );

        let populated = PopulatedCart::from_cart(cart, &products);

        assert!(matches!(populated.items[0].product, ProductRef::Populated(ref p) if p.name == "Kibble"));
        assert_eq!(populated.items[1].product, ProductRef::Unresolved("P2".to_string()));
        assert_eq!(PopulatedCart::product_id(&populated.items[1]), "P2");

        let json = serde_json::to_value(&populated).unwrap();
        assert_eq!(json["cartItems"][0]["product"]["_id"], "P1");
        assert_eq!(json["cartItems"][1]["product"], "P2");
    }
}
