//! Records persisted by the store.

mod cart;
mod order;
mod product;

pub use cart::{Cart, CartLine, CartStatus};
pub use order::{Order, OrderLine, OrderStatus, PaymentMethod, PaymentStatus};
pub use product::Product;

use thiserror::Error;

/// A stored enum label that does not name any known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
