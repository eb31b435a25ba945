//! Administrative status transitions and order queries.

use std::sync::Arc;

use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};
use store::{Order, OrderStatus, PaymentStatus, Store, StoreTx};

use crate::directory::UserDirectory;
use crate::error::{DomainError, Result};
use crate::events::{EventPublisher, OrderEvent, OrderStatusChangedData};
use crate::snapshot::OrderSnapshot;

/// Command to change an order's status pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOrderStatus {
    pub order_status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

impl UpdateOrderStatus {
    pub fn status(order_status: OrderStatus) -> Self {
        Self {
            order_status: Some(order_status),
            payment_status: None,
        }
    }

    pub fn payment(payment_status: PaymentStatus) -> Self {
        Self {
            order_status: None,
            payment_status: Some(payment_status),
        }
    }
}

/// Service for reading orders and applying administrator status changes.
pub struct OrderService<S: Store> {
    store: S,
    users: Arc<dyn UserDirectory>,
    publisher: Arc<dyn EventPublisher>,
}

impl<S: Store> OrderService<S> {
    pub fn new(
        store: S,
        users: Arc<dyn UserDirectory>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            users,
            publisher,
        }
    }

    /// Applies an administrator's status change.
    ///
    /// Any status may follow any other; a move outside the usual lifecycle is
    /// logged but allowed. Moving to `Completed` without an explicit payment
    /// status marks the order paid. A supplied payment status always wins.
    /// `OrderStatusChanged` is published only when the order status differs
    /// from the stored one.
    #[tracing::instrument(skip(self))]
    pub async fn update_order(
        &self,
        order_id: OrderId,
        cmd: UpdateOrderStatus,
    ) -> Result<OrderSnapshot> {
        let mut tx = self.store.begin().await?;
        let mut order = tx
            .lock_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("order", order_id))?;

        let old_status = order.order_status();
        let mut status_changed = false;

        if let Some(new_status) = cmd.order_status {
            if new_status == OrderStatus::Completed && cmd.payment_status.is_none() {
                order.set_payment_status(PaymentStatus::Paid);
            }

            if new_status != old_status {
                if !old_status.follows_lifecycle(new_status) {
                    tracing::warn!(
                        order_id = %order_id,
                        from = %old_status,
                        to = %new_status,
                        "order status moved outside the usual lifecycle"
                    );
                }
                order.set_order_status(new_status);
                status_changed = true;
            }
        }

        if let Some(payment_status) = cmd.payment_status {
            order.set_payment_status(payment_status);
        }

        tx.save_order_status(&order).await?;
        tx.commit().await?;

        let snapshot = self.snapshot(&order).await;

        if status_changed {
            let new_status = order.order_status();
            metrics::counter!(
                "order_status_changes_total",
                "from" => old_status.as_str(),
                "to" => new_status.as_str()
            )
            .increment(1);
            tracing::info!(order_id = %order_id, from = %old_status, to = %new_status, "order status changed");

            self.publisher
                .publish(OrderEvent::OrderStatusChanged(OrderStatusChangedData {
                    order: snapshot.clone(),
                    old_status,
                    new_status,
                }));
        }

        Ok(snapshot)
    }

    /// Returns the user's orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderSnapshot>> {
        let email = self.users.find_user(user_id).await.map(|user| user.email);
        let orders = self.store.orders_for_user(user_id).await?;
        Ok(orders
            .iter()
            .map(|order| OrderSnapshot::new(order, email.clone()))
            .collect())
    }

    /// Returns one of the user's orders.
    ///
    /// Fails with `InvalidState` if the order belongs to someone else.
    #[tracing::instrument(skip(self))]
    pub async fn order_for_user(&self, user_id: UserId, order_id: OrderId) -> Result<OrderSnapshot> {
        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("order", order_id))?;

        if order.user_id() != user_id {
            return Err(DomainError::InvalidState(
                "you do not have permission to view this order".to_string(),
            ));
        }

        Ok(self.snapshot(&order).await)
    }

    async fn snapshot(&self, order: &Order) -> OrderSnapshot {
        let email = self
            .users
            .find_user(order.user_id())
            .await
            .map(|user| user.email);
        OrderSnapshot::new(order, email)
    }
}
