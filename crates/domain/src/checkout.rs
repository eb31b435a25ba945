//! Checkout: turns the user's active cart into a priced order.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use common::{AddressId, Money, ProductId, UserId};
use serde::{Deserialize, Serialize};
use store::{Order, OrderLine, PaymentMethod, Store, StoreTx};

use crate::directory::{AddressBook, User, UserDirectory};
use crate::error::{DomainError, Result};
use crate::events::{EventPublisher, OrderEvent, OrderPlacedData};
use crate::snapshot::OrderSnapshot;

/// Checkout pricing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutConfig {
    /// Flat shipping charge added to every order.
    pub shipping_cost: Money,
}

impl CheckoutConfig {
    /// Default flat shipping charge ($5.00).
    pub const DEFAULT_SHIPPING_COST: Money = Money::from_cents(500);

    /// Creates a config from environment variables.
    ///
    /// `SHIPPING_COST_CENTS` overrides the shipping charge.
    pub fn from_env() -> Self {
        let shipping_cost = std::env::var("SHIPPING_COST_CENTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Money::from_cents)
            .unwrap_or(Self::DEFAULT_SHIPPING_COST);

        Self { shipping_cost }
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            shipping_cost: Self::DEFAULT_SHIPPING_COST,
        }
    }
}

/// Where the order ships to.
///
/// A saved address takes precedence. The inline address is used when no
/// saved address is given or the saved one does not resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDestination {
    pub address_id: Option<AddressId>,
    pub shipping_address: Option<String>,
}

impl ShippingDestination {
    pub fn saved(address_id: AddressId) -> Self {
        Self {
            address_id: Some(address_id),
            shipping_address: None,
        }
    }

    pub fn inline(address: impl Into<String>) -> Self {
        Self {
            address_id: None,
            shipping_address: Some(address.into()),
        }
    }
}

/// Command to check out the user's active cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrder {
    pub user_id: UserId,
    pub destination: ShippingDestination,
    pub payment_method: Option<PaymentMethod>,
}

impl PlaceOrder {
    pub fn new(
        user_id: UserId,
        destination: ShippingDestination,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            user_id,
            destination,
            payment_method: Some(payment_method),
        }
    }
}

/// The checkout use case.
///
/// One call is one transaction: every product row the cart touches stays
/// locked until the order is committed or the whole attempt is rolled back.
/// Products are locked in ascending id order while order lines keep the
/// cart's line order.
/// The `OrderPlaced` event is published only after a successful commit.
pub struct CheckoutService<S: Store> {
    store: S,
    users: Arc<dyn UserDirectory>,
    addresses: Arc<dyn AddressBook>,
    publisher: Arc<dyn EventPublisher>,
    config: CheckoutConfig,
}

impl<S: Store> CheckoutService<S> {
    pub fn new(
        store: S,
        users: Arc<dyn UserDirectory>,
        addresses: Arc<dyn AddressBook>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            users,
            addresses,
            publisher,
            config: CheckoutConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CheckoutConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Places an order from the user's active cart.
    #[tracing::instrument(skip(self, cmd), fields(user_id = %cmd.user_id))]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<OrderSnapshot> {
        let started = Instant::now();
        metrics::counter!("checkout_attempts_total").increment(1);

        let result = self.checkout(cmd).await;
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());

        match result {
            Ok(snapshot) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(
                    order_id = %snapshot.id,
                    total = %snapshot.total,
                    items = snapshot.items.len(),
                    "order placed"
                );
                self.publisher
                    .publish(OrderEvent::OrderPlaced(OrderPlacedData {
                        order: snapshot.clone(),
                    }));
                Ok(snapshot)
            }
            Err(e) => {
                metrics::counter!("checkout_failures_total", "reason" => e.kind()).increment(1);
                tracing::warn!(error = %e, "checkout failed");
                Err(e)
            }
        }
    }

    async fn checkout(&self, cmd: PlaceOrder) -> Result<OrderSnapshot> {
        let payment_method = cmd
            .payment_method
            .ok_or_else(|| DomainError::Validation("payment method is required".to_string()))?;

        let user = self
            .users
            .find_user(cmd.user_id)
            .await
            .ok_or_else(|| DomainError::not_found("user", cmd.user_id))?;

        let shipping_address = self.resolve_destination(&user, &cmd.destination).await?;

        // Dropping `tx` on any early return rolls back every write below.
        let mut tx = self.store.begin().await?;

        let mut cart = tx
            .lock_active_cart(user.id)
            .await?
            .ok_or_else(|| DomainError::InvalidState("no active cart".to_string()))?;
        if cart.is_empty() {
            return Err(DomainError::InvalidState("cart is empty".to_string()));
        }

        let mut order = Order::new(user.id, shipping_address, payment_method);

        // Every product is locked before any stock changes, in ascending id order.
        let mut product_ids: Vec<&ProductId> =
            cart.lines().iter().map(|line| &line.product_id).collect();
        product_ids.sort();
        product_ids.dedup();

        let mut products = BTreeMap::new();
        for product_id in product_ids {
            let product = tx
                .lock_product(product_id)
                .await?
                .ok_or_else(|| DomainError::not_found("product", product_id))?;
            products.insert(product_id.clone(), product);
        }

        for line in cart.lines() {
            let product = products
                .get_mut(&line.product_id)
                .ok_or_else(|| DomainError::not_found("product", &line.product_id))?;

            if !product.decrement_stock(line.quantity) {
                return Err(DomainError::OutOfStock {
                    product_name: product.name.clone(),
                    available: product.stock_quantity,
                });
            }

            order.add_line(OrderLine {
                product_id: line.product_id.clone(),
                product_name: product.name.clone(),
                quantity: line.quantity,
                price_at_purchase: product.effective_price(),
            });
        }

        for product in products.values() {
            tx.save_product(product).await?;
        }

        order.apply_charges(self.config.shipping_cost, Money::zero());
        tx.insert_order(&order).await?;

        cart.mark_checked_out();
        tx.save_cart(&cart).await?;

        tx.commit().await?;

        Ok(OrderSnapshot::new(&order, Some(user.email)))
    }

    async fn resolve_destination(
        &self,
        user: &User,
        destination: &ShippingDestination,
    ) -> Result<String> {
        if let Some(address_id) = destination.address_id {
            match self.addresses.resolve(user.id, address_id).await {
                Some(address) if !address.trim().is_empty() => return Ok(address),
                _ => tracing::debug!(
                    address_id = %address_id,
                    "saved address did not resolve, trying inline address"
                ),
            }
        }

        destination
            .shipping_address
            .as_deref()
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .map(str::to_string)
            .ok_or_else(|| DomainError::Validation("a shipping address is required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shipping_cost() {
        assert_eq!(
            CheckoutConfig::default().shipping_cost,
            Money::from_cents(500)
        );
    }

    #[test]
    fn test_place_order_constructor_sets_payment_method() {
        let cmd = PlaceOrder::new(
            UserId::new(),
            ShippingDestination::inline("1 Main St"),
            PaymentMethod::Cod,
        );
        assert_eq!(cmd.payment_method, Some(PaymentMethod::Cod));
        assert_eq!(cmd.destination.shipping_address.as_deref(), Some("1 Main St"));
    }
}
