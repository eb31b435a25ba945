//! Administrator order management.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::OrderId;
use domain::{OrderSnapshot, UpdateOrderStatus};
use store::Store;

use super::{AppState, parse_id};
use crate::error::ApiError;

/// PUT /admin/orders/{order_id} — set the order and/or payment status.
///
/// Body: `{"order_status"?: "PROCESSING", "payment_status"?: "PAID"}`.
#[tracing::instrument(skip(state, cmd))]
pub async fn update_order<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(order_id): Path<String>,
    Json(cmd): Json<UpdateOrderStatus>,
) -> Result<Json<OrderSnapshot>, ApiError> {
    let order_id: OrderId = parse_id("order", &order_id)?;
    Ok(Json(state.orders.update_order(order_id, cmd).await?))
}
