mod common;

use cart_rs::models::{Cart, CartItem, PopulatedCart, ProductRef};
use common::{item, TestEnvironment, TEST_USER};
use serde_json::{json, Value};

#[tokio::test]
async fn test_replace_creates_cart_with_complete_items_only() {
    let test_env = TestEnvironment::new().await;

    let response = test_env
        .replace_items(
            TEST_USER,
            json!([
                {"product": "P1", "price": 10, "image": "i", "qty": 2, "name": "N"},
                {"product": "P2"}
            ]),
        )
        .await;

    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Cart updated");

    let cart: Cart = serde_json::from_value(body["cart"].clone()).expect("Expected a cart");
    assert_eq!(cart.user(), TEST_USER);
    assert_eq!(cart.items().len(), 1);
    assert_eq!(cart.items()[0].product, "P1");
    assert_eq!(cart.items()[0].qty, 2);

    // The user record now points at the new cart
    assert_eq!(
        test_env.users.cart_ref(TEST_USER).await.as_deref(),
        Some(cart.id())
    );
    assert_eq!(test_env.carts.cart_count().await, 1);
}

#[tokio::test]
async fn test_second_replace_mutates_same_cart() {
    let test_env = TestEnvironment::new().await;

    let first: Value = test_env
        .replace_items(TEST_USER, json!([item("P1", 1)]))
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let second: Value = test_env
        .replace_items(TEST_USER, json!([item("P2", 4), item("P3", 1)]))
        .await
        .json()
        .await
        .expect("Failed to parse response");

    assert_eq!(first["cart"]["_id"], second["cart"]["_id"]);
    assert_eq!(second["cart"]["cartItems"].as_array().map(Vec::len), Some(2));
    assert_eq!(test_env.carts.cart_count().await, 1);
}

#[tokio::test]
async fn test_get_cart_populates_products() {
    let test_env = TestEnvironment::new().await;
    test_env
        .replace_items(TEST_USER, json!([item("P1", 2), item("GONE", 1)]))
        .await;

    let response = test_env.get_cart(TEST_USER).await;
    assert_eq!(response.status().as_u16(), 200);

    let cart: PopulatedCart = response.json().await.expect("Failed to parse response");
    assert_eq!(cart.items.len(), 2);
    match &cart.items[0].product {
        ProductRef::Populated(product) => assert_eq!(product.name, "Premium Puppy Food"),
        other => panic!("Expected populated product, got {:?}", other),
    }
    assert_eq!(
        cart.items[1].product,
        ProductRef::Unresolved("GONE".to_string())
    );
}

#[tokio::test]
async fn test_get_cart_without_cart_is_not_found() {
    let test_env = TestEnvironment::new().await;

    let response = test_env.get_cart(TEST_USER).await;

    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Cart not found");
}

#[tokio::test]
async fn test_remove_item() {
    let test_env = TestEnvironment::new().await;
    test_env
        .replace_items(TEST_USER, json!([item("P1", 2), item("P3", 1)]))
        .await;

    let response = test_env.remove_item(TEST_USER, "P1").await;
    assert_eq!(response.status().as_u16(), 200);
    let cart: Cart = response.json().await.expect("Failed to parse response");
    assert_eq!(cart.items().len(), 1);
    assert_eq!(cart.items()[0].product, "P3");

    let cart: PopulatedCart = test_env
        .get_cart(TEST_USER)
        .await
        .json()
        .await
        .expect("Failed to parse response");
    assert!(cart
        .items
        .iter()
        .all(|item| PopulatedCart::product_id(item) != "P1"));
}

#[tokio::test]
async fn test_remove_absent_product_still_succeeds() {
    let test_env = TestEnvironment::new().await;
    test_env.replace_items(TEST_USER, json!([item("P1", 2)])).await;

    let response = test_env.remove_item(TEST_USER, "P9").await;

    assert_eq!(response.status().as_u16(), 200);
    let cart: Cart = response.json().await.expect("Failed to parse response");
    assert_eq!(cart.items().len(), 1);
}

#[tokio::test]
async fn test_update_item_quantity() {
    let test_env = TestEnvironment::new().await;
    test_env.replace_items(TEST_USER, json!([item("P1", 2)])).await;

    let response = test_env.update_quantity(TEST_USER, "P1", 5).await;
    assert_eq!(response.status().as_u16(), 200);
    let updated: CartItem = response.json().await.expect("Failed to parse response");
    assert_eq!(updated.product, "P1");
    assert_eq!(updated.qty, 5);

    let cart: PopulatedCart = test_env
        .get_cart(TEST_USER)
        .await
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(cart.items[0].qty, 5);
}

#[tokio::test]
async fn test_update_item_quantity_casts_loose_values() {
    let test_env = TestEnvironment::new().await;
    test_env
        .replace_items(TEST_USER, json!([item("P1", 2), item("P2", 1)]))
        .await;

    let response = test_env.update_quantity(TEST_USER, "P1", json!("5")).await;
    assert_eq!(response.status().as_u16(), 200);
    let updated: CartItem = response.json().await.expect("Failed to parse response");
    assert_eq!(updated.qty, 5);

    let response = test_env.update_quantity(TEST_USER, "P2", json!(2.0)).await;
    assert_eq!(response.status().as_u16(), 200);
    let updated: CartItem = response.json().await.expect("Failed to parse response");
    assert_eq!(updated.qty, 2);

    let response = test_env.update_quantity(TEST_USER, "P1", json!("many")).await;
    assert_eq!(response.status().as_u16(), 500);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body, json!({"message": "Internal Server Error"}));

    let cart: PopulatedCart = test_env
        .get_cart(TEST_USER)
        .await
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(cart.items[0].qty, 5);
}

#[tokio::test]
async fn test_update_missing_item_or_cart_is_not_found() {
    let test_env = TestEnvironment::new().await;

    let response = test_env.update_quantity(TEST_USER, "P1", 5).await;
    assert_eq!(response.status().as_u16(), 404);

    test_env.replace_items(TEST_USER, json!([item("P1", 2)])).await;
    let response = test_env.update_quantity(TEST_USER, "P2", 5).await;
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Cart item not found");
}

#[tokio::test]
async fn test_requests_without_identity_are_unauthorized() {
    let test_env = TestEnvironment::new().await;

    let response = test_env
        .client
        .get(test_env.url("/cart"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Not authorized, no user identity");
}

#[tokio::test]
async fn test_error_handling() {
    let test_env = TestEnvironment::new().await;

    // Truthy price that cannot be cast to a number fails like a store error
    let response = test_env
        .replace_items(
            TEST_USER,
            json!([{"product": "P1", "name": "N", "price": "abc", "image": "i", "qty": 1}]),
        )
        .await;
    assert_eq!(response.status().as_u16(), 500);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body, json!({"message": "Internal Server Error"}));
    assert_eq!(test_env.carts.cart_count().await, 0);

    // Missing cartItems field
    let response = test_env
        .as_user(test_env.client.post(test_env.url("/cart")), TEST_USER)
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 422);

    // Non-JSON body
    let response = test_env
        .as_user(test_env.client.post(test_env.url("/cart")), TEST_USER)
        .header("content-type", "text/plain")
        .body("cartItems")
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 415);
}

#[tokio::test]
async fn test_unknown_user_on_create_is_server_error() {
    let test_env = TestEnvironment::with_users(Vec::<String>::new()).await;

    let response = test_env.replace_items("stranger", json!([item("P1", 1)])).await;

    assert_eq!(response.status().as_u16(), 500);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body, json!({"message": "Internal Server Error"}));
    // The cart was persisted before the user update failed
    assert_eq!(test_env.carts.cart_count().await, 1);
}

#[tokio::test]
async fn test_user_link_failure_is_server_error() {
    let test_env = TestEnvironment::new().await;
    test_env.users.set_fail_on_set_cart(true).await;

    let response = test_env.replace_items(TEST_USER, json!([item("P1", 1)])).await;

    assert_eq!(response.status().as_u16(), 500);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body, json!({"message": "Internal Server Error"}));
    // The cart is left behind without a user link
    assert_eq!(test_env.carts.cart_count().await, 1);
    assert_eq!(test_env.users.cart_ref(TEST_USER).await, None);
}

#[tokio::test]
async fn test_product_lookup_failure_is_server_error() {
    let test_env = TestEnvironment::new().await;
    test_env.replace_items(TEST_USER, json!([item("P1", 1)])).await;
    test_env.products.set_fail_on_find(true).await;

    let response = test_env.get_cart(TEST_USER).await;

    assert_eq!(response.status().as_u16(), 500);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body, json!({"message": "Internal Server Error"}));
}

#[tokio::test]
async fn test_api_prefixed_routes() {
    let test_env = TestEnvironment::new().await;

    let response = test_env
        .as_user(test_env.client.post(test_env.url("/api/cart")), TEST_USER)
        .json(&json!({"cartItems": [item("P2", 3)]}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 201);

    let response = test_env
        .as_user(test_env.client.get(test_env.url("/api/cart")), TEST_USER)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);

    let response = test_env
        .as_user(
            test_env.client.put(test_env.url("/api/cart/P2")),
            TEST_USER,
        )
        .json(&json!({"qty": 7}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);

    let response = test_env
        .as_user(
            test_env.client.delete(test_env.url("/api/cart/remove/P2")),
            TEST_USER,
        )
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn test_health_endpoint() {
    let test_env = TestEnvironment::new().await;

    let response = test_env
        .client
        .get(test_env.url("/health/status"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 200);
    let health: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["service"], "cart-rs");
}
