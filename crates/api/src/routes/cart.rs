//! The user's active cart.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{ProductId, UserId};
use domain::CartView;
use serde::Deserialize;
use store::Store;

use super::{AppState, parse_id};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CartItemRequest {
    pub product_id: String,
    pub quantity: u32,
}

/// GET /users/{user_id}/cart — the active cart, created empty on first access.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<String>,
) -> Result<Json<CartView>, ApiError> {
    let user_id: UserId = parse_id("user", &user_id)?;
    Ok(Json(state.carts.get_cart(user_id).await?))
}

/// POST /users/{user_id}/cart/items — add units of a product.
#[tracing::instrument(skip(state))]
pub async fn add_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<String>,
    Json(req): Json<CartItemRequest>,
) -> Result<Json<CartView>, ApiError> {
    let user_id: UserId = parse_id("user", &user_id)?;
    let cart = state
        .carts
        .add_line(user_id, ProductId::new(req.product_id), req.quantity)
        .await?;
    Ok(Json(cart))
}

/// POST /users/{user_id}/cart/items/decrement — take units off a line.
#[tracing::instrument(skip(state))]
pub async fn decrement_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<String>,
    Json(req): Json<CartItemRequest>,
) -> Result<Json<CartView>, ApiError> {
    let user_id: UserId = parse_id("user", &user_id)?;
    let cart = state
        .carts
        .decrement_line(user_id, ProductId::new(req.product_id), req.quantity)
        .await?;
    Ok(Json(cart))
}

/// DELETE /users/{user_id}/cart/items/{product_id}
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path((user_id, product_id)): Path<(String, String)>,
) -> Result<Json<CartView>, ApiError> {
    let user_id: UserId = parse_id("user", &user_id)?;
    let cart = state
        .carts
        .remove_line(user_id, ProductId::new(product_id))
        .await?;
    Ok(Json(cart))
}

/// DELETE /users/{user_id}/cart — empty the cart.
#[tracing::instrument(skip(state))]
pub async fn clear<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<String>,
) -> Result<Json<CartView>, ApiError> {
    let user_id: UserId = parse_id("user", &user_id)?;
    Ok(Json(state.carts.clear(user_id).await?))
}
