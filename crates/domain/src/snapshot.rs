//! External representation of an order.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};
use store::{Order, OrderLine, OrderStatus, PaymentMethod, PaymentStatus};

/// A read-only copy of an order as handed to callers and carried by events.
///
/// Amounts serialize as integer cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub id: OrderId,
    pub user_id: UserId,
    /// Purchaser's email, if the user directory still knows the user.
    pub user_email: Option<String>,
    pub order_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub shipping_address: String,
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub discount_amount: Money,
    pub total: Money,
    pub order_status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub items: Vec<OrderItemSnapshot>,
}

/// One line of an [`OrderSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemSnapshot {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price_at_purchase: Money,
    pub subtotal: Money,
}

impl From<&OrderLine> for OrderItemSnapshot {
    fn from(line: &OrderLine) -> Self {
        Self {
            product_id: line.product_id.clone(),
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            price_at_purchase: line.price_at_purchase,
            subtotal: line.subtotal(),
        }
    }
}

impl OrderSnapshot {
    pub fn new(order: &Order, user_email: Option<String>) -> Self {
        Self {
            id: order.id(),
            user_id: order.user_id(),
            user_email,
            order_date: order.created_at(),
            updated_at: order.updated_at(),
            shipping_address: order.shipping_address().to_string(),
            subtotal: order.subtotal(),
            shipping_cost: order.shipping_cost(),
            discount_amount: order.discount_amount(),
            total: order.total(),
            order_status: order.order_status(),
            payment_method: order.payment_method(),
            payment_status: order.payment_status(),
            transaction_id: order.transaction_id().map(str::to_string),
            items: order.lines().iter().map(OrderItemSnapshot::from).collect(),
        }
    }

    /// Total number of units across all items.
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}
