use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, put},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, instrument};

use super::{service_error_to_response, AuthenticatedUser};
use crate::models::{
    Cart, CartItem, CartItemCandidate, PopulatedCart, ReplaceCartItemsRequest,
    ReplaceCartResponse, UpdateCartItemRequest,
};
use crate::services::CartService;

type HandlerError = (StatusCode, Json<Value>);

/// State for cart handlers
#[derive(Clone)]
pub struct CartHandlerState {
    pub cart_service: Arc<CartService>,
}

/// Create cart router with all endpoints
pub fn create_cart_router(cart_service: Arc<CartService>) -> Router {
    let state = CartHandlerState { cart_service };

    Router::new()
        .route("/cart", get(get_cart).post(replace_cart_items))
        .route("/cart/remove/:product_id", delete(remove_cart_item))
        .route("/cart/:product_id", put(update_cart_item))
        .with_state(state)
}

/// Get the acting user's cart with products expanded
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get_cart(
    State(state): State<CartHandlerState>,
    user: AuthenticatedUser,
) -> Result<Json<PopulatedCart>, HandlerError> {
    match state.cart_service.get_cart(&user.user_id).await {
        Ok(cart) => {
            info!("Retrieved cart with {} items", cart.items.len());
            Ok(Json(cart))
        }
        Err(err) => {
            error!("Failed to get cart for user {}: {}", user.user_id, err);
            Err(service_error_to_response(err))
        }
    }
}

/// Replace the acting user's cart items, creating the cart if needed
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn replace_cart_items(
    State(state): State<CartHandlerState>,
    user: AuthenticatedUser,
    Json(request): Json<ReplaceCartItemsRequest>,
) -> Result<(StatusCode, Json<ReplaceCartResponse>), HandlerError> {
    let candidates = request
        .cart_items
        .into_iter()
        .map(CartItemCandidate::from_value)
        .collect();

    match state
        .cart_service
        .replace_items(&user.user_id, candidates)
        .await
    {
        Ok(cart) => {
            info!("Cart {} now holds {} items", cart.id(), cart.items().len());
            Ok((
                StatusCode::CREATED,
                Json(ReplaceCartResponse {
                    message: "Cart updated".to_string(),
                    cart,
                }),
            ))
        }
        Err(err) => {
            error!("Failed to replace cart items for user {}: {}", user.user_id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn remove_cart_item(
    State(state): State<CartHandlerState>,
    user: AuthenticatedUser,
    Path(product_id): Path<String>,
) -> Result<Json<Cart>, HandlerError> {
    match state
        .cart_service
        .remove_item(&user.user_id, &product_id)
        .await
    {
        Ok(cart) => Ok(Json(cart)),
        Err(err) => {
            error!("Failed to remove {} from cart: {}", product_id, err);
            Err(service_error_to_response(err))
        }
    }
}

/// Set the quantity of one cart item
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn update_cart_item(
    State(state): State<CartHandlerState>,
    user: AuthenticatedUser,
    Path(product_id): Path<String>,
    Json(request): Json<UpdateCartItemRequest>,
) -> Result<Json<CartItem>, HandlerError> {
    match state
        .cart_service
        .update_item_quantity(&user.user_id, &product_id, request.qty)
        .await
    {
        Ok(item) => Ok(Json(item)),
        Err(err) => {
            error!("Failed to update {} in cart: {}", product_id, err);
            Err(service_error_to_response(err))
        }
    }
}
