//! Checkout and the user's order history.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{AddressId, OrderId, UserId};
use domain::{OrderSnapshot, PlaceOrder, ShippingDestination};
use serde::Deserialize;
use store::{PaymentMethod, Store};

use super::{AppState, parse_id};
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct PlaceOrderRequest {
    pub address_id: Option<AddressId>,
    pub shipping_address: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

/// POST /users/{user_id}/orders — check out the active cart.
#[tracing::instrument(skip(state, req))]
pub async fn place<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<String>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderSnapshot>), ApiError> {
    let user_id: UserId = parse_id("user", &user_id)?;
    let cmd = PlaceOrder {
        user_id,
        destination: ShippingDestination {
            address_id: req.address_id,
            shipping_address: req.shipping_address,
        },
        payment_method: req.payment_method,
    };

    let order = state.checkout.place_order(cmd).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /users/{user_id}/orders — newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<OrderSnapshot>>, ApiError> {
    let user_id: UserId = parse_id("user", &user_id)?;
    Ok(Json(state.orders.orders_for_user(user_id).await?))
}

/// GET /users/{user_id}/orders/{order_id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path((user_id, order_id)): Path<(String, String)>,
) -> Result<Json<OrderSnapshot>, ApiError> {
    let user_id: UserId = parse_id("user", &user_id)?;
    let order_id: OrderId = parse_id("order", &order_id)?;
    Ok(Json(state.orders.order_for_user(user_id, order_id).await?))
}
