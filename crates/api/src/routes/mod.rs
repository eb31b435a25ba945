//! HTTP route handlers and the state they share.

pub mod admin;
pub mod cart;
pub mod health;
pub mod metrics;
pub mod orders;

use std::str::FromStr;

use domain::{CartService, CheckoutService, OrderService};
use store::Store;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub carts: CartService<S>,
    pub checkout: CheckoutService<S>,
    pub orders: OrderService<S>,
}

/// Parses a UUID-backed id from a path segment.
pub(crate) fn parse_id<T>(kind: &str, raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = uuid::Error>,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {kind} ID: {e}")))
}
