//! Cart service: the user's single active cart and its line edits.

use std::sync::Arc;

use common::{CartId, Money, ProductId, UserId};
use serde::{Deserialize, Serialize};
use store::{Cart, Product, Store, StoreTx};

use crate::directory::UserDirectory;
use crate::error::{DomainError, Result};

/// A cart priced at current catalog prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartView {
    pub cart_id: CartId,
    pub user_id: UserId,
    pub lines: Vec<CartViewLine>,
    pub total: Money,
}

/// One priced cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartViewLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// Service for the user's active cart.
///
/// Every mutation runs in its own transaction holding the user's cart slot,
/// so the at-most-one-active-cart rule holds under concurrent requests.
/// A cart is only ever created for a user the directory knows.
pub struct CartService<S: Store> {
    store: S,
    users: Arc<dyn UserDirectory>,
}

impl<S: Store> CartService<S> {
    pub fn new(store: S, users: Arc<dyn UserDirectory>) -> Self {
        Self { store, users }
    }

    /// Returns the user's active cart, creating an empty one if none exists.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<CartView> {
        let cart = match self.store.find_active_cart(user_id).await? {
            Some(cart) => cart,
            None => self.mutate(user_id, |_| Ok(())).await?,
        };
        self.view(&cart).await
    }

    /// Adds units of a product to the cart.
    ///
    /// The stock check here is advisory only; checkout re-checks under lock.
    #[tracing::instrument(skip(self))]
    pub async fn add_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartView> {
        require_positive(quantity)?;
        let product = self.available_product(&product_id).await?;

        let cart = self
            .mutate(user_id, |cart| {
                let requested = cart.quantity_of(&product_id).saturating_add(quantity);
                if requested > product.stock_quantity {
                    return Err(DomainError::OutOfStock {
                        product_name: product.name.clone(),
                        available: product.stock_quantity,
                    });
                }
                cart.add_quantity(product_id.clone(), quantity);
                Ok(())
            })
            .await?;

        tracing::debug!(cart_id = %cart.id(), product_id = %product_id, quantity, "cart line added");
        self.view(&cart).await
    }

    /// Removes units of a product; the line disappears when nothing is left.
    ///
    /// Works on any existing line, even one whose product was since withdrawn.
    #[tracing::instrument(skip(self))]
    pub async fn decrement_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartView> {
        require_positive(quantity)?;

        let cart = self
            .mutate(user_id, |cart| {
                cart.decrement_quantity(&product_id, quantity)
                    .map(|_| ())
                    .ok_or_else(|| DomainError::not_found("cart line", &product_id))
            })
            .await?;
        self.view(&cart).await
    }

    /// Removes a product's line from the cart.
    #[tracing::instrument(skip(self))]
    pub async fn remove_line(&self, user_id: UserId, product_id: ProductId) -> Result<CartView> {
        let cart = self
            .mutate(user_id, |cart| {
                if cart.remove_line(&product_id) {
                    Ok(())
                } else {
                    Err(DomainError::not_found("cart line", &product_id))
                }
            })
            .await?;
        self.view(&cart).await
    }

    /// Empties the cart.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<CartView> {
        let cart = self
            .mutate(user_id, |cart| {
                cart.clear();
                Ok(())
            })
            .await?;
        self.view(&cart).await
    }

    /// Locks the cart slot, applies `edit` to the active cart (created if
    /// missing) and commits. Nothing is written if `edit` fails.
    async fn mutate<F>(&self, user_id: UserId, edit: F) -> Result<Cart>
    where
        F: FnOnce(&mut Cart) -> Result<()>,
    {
        let mut tx = self.store.begin().await?;
        let mut cart = match tx.lock_active_cart(user_id).await? {
            Some(cart) => cart,
            None => {
                if self.users.find_user(user_id).await.is_none() {
                    return Err(DomainError::not_found("user", user_id));
                }
                tracing::debug!(user_id = %user_id, "creating active cart");
                Cart::new(user_id)
            }
        };

        edit(&mut cart)?;

        tx.save_cart(&cart).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn available_product(&self, product_id: &ProductId) -> Result<Product> {
        let product = self
            .store
            .find_product(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("product", product_id))?;

        if !product.active {
            return Err(DomainError::InvalidState(format!(
                "product '{}' is not available",
                product.name
            )));
        }
        Ok(product)
    }

    async fn view(&self, cart: &Cart) -> Result<CartView> {
        let mut lines = Vec::with_capacity(cart.lines().len());
        for line in cart.lines() {
            let product = self
                .store
                .find_product(&line.product_id)
                .await?
                .ok_or_else(|| DomainError::not_found("product", &line.product_id))?;
            let unit_price = product.effective_price();
            lines.push(CartViewLine {
                product_id: line.product_id.clone(),
                product_name: product.name,
                quantity: line.quantity,
                unit_price,
                subtotal: unit_price.multiply(line.quantity),
            });
        }

        Ok(CartView {
            cart_id: cart.id(),
            user_id: cart.user_id(),
            total: lines.iter().map(|line| line.subtotal).sum(),
            lines,
        })
    }
}

fn require_positive(quantity: u32) -> Result<()> {
    if quantity == 0 {
        return Err(DomainError::Validation(
            "quantity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use store::InMemoryStore;

    use super::*;
    use crate::directory::{InMemoryUserDirectory, User};

    struct Fixture {
        service: CartService<InMemoryStore>,
        store: InMemoryStore,
        users: Arc<InMemoryUserDirectory>,
    }

    impl Fixture {
        fn user(&self) -> UserId {
            let id = UserId::new();
            self.users.insert(User::new(id, "shopper@example.com", "Shopper"));
            id
        }
    }

    async fn setup() -> Fixture {
        let store = InMemoryStore::new();
        store
            .put_product(Product::new("A", "Espresso", Money::from_cents(1000), 3))
            .await
            .unwrap();
        store
            .put_product(
                Product::new("B", "Croissant", Money::from_cents(500), 1)
                    .with_discount(Money::from_cents(400)),
            )
            .await
            .unwrap();
        store
            .put_product(Product::new("X", "Retired", Money::from_cents(100), 10).deactivated())
            .await
            .unwrap();
        let users = Arc::new(InMemoryUserDirectory::new());
        Fixture {
            service: CartService::new(store.clone(), users.clone()),
            store,
            users,
        }
    }

    #[tokio::test]
    async fn test_get_cart_creates_exactly_one_active_cart() {
        let f = setup().await;
        let (service, store) = (&f.service, &f.store);
        let user = f.user();

        let first = service.get_cart(user).await.unwrap();
        let second = service.get_cart(user).await.unwrap();

        assert_eq!(first.cart_id, second.cart_id);
        assert!(first.lines.is_empty());
        assert_eq!(store.carts_for_user(user).await.len(), 1);
    }

    #[tokio::test]
    async fn test_add_line_prices_at_effective_price() {
        let f = setup().await;
        let service = &f.service;
        let user = f.user();

        service.add_line(user, "A".into(), 2).await.unwrap();
        let view = service.add_line(user, "B".into(), 1).await.unwrap();

        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.lines[1].unit_price, Money::from_cents(400));
        assert_eq!(view.total, Money::from_cents(2400));
    }

    #[tokio::test]
    async fn test_add_line_soft_stock_check_counts_existing_quantity() {
        let f = setup().await;
        let service = &f.service;
        let user = f.user();

        service.add_line(user, "A".into(), 2).await.unwrap();
        let err = service.add_line(user, "A".into(), 2).await.unwrap_err();

        assert!(matches!(err, DomainError::OutOfStock { available: 3, .. }));
        let view = service.get_cart(user).await.unwrap();
        assert_eq!(view.lines[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_inactive_product_is_rejected() {
        let f = setup().await;
        let err = f
            .service
            .add_line(f.user(), "X".into(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(msg) if msg.contains("not available")));
    }

    #[tokio::test]
    async fn test_unknown_product_and_zero_quantity() {
        let f = setup().await;
        let service = &f.service;
        let user = f.user();

        assert!(matches!(
            service.add_line(user, "nope".into(), 1).await,
            Err(DomainError::NotFound { entity: "product", .. })
        ));
        assert!(matches!(
            service.add_line(user, "A".into(), 0).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_decrement_remove_and_clear() {
        let f = setup().await;
        let service = &f.service;
        let user = f.user();
        service.add_line(user, "A".into(), 3).await.unwrap();
        service.add_line(user, "B".into(), 1).await.unwrap();

        let view = service.decrement_line(user, "A".into(), 1).await.unwrap();
        assert_eq!(view.lines[0].quantity, 2);

        let view = service.decrement_line(user, "A".into(), 5).await.unwrap();
        assert_eq!(view.lines.len(), 1);

        assert!(matches!(
            service.remove_line(user, "A".into()).await,
            Err(DomainError::NotFound { entity: "cart line", .. })
        ));

        let view = service.remove_line(user, "B".into()).await.unwrap();
        assert!(view.lines.is_empty());

        service.add_line(user, "A".into(), 1).await.unwrap();
        let view = service.clear(user).await.unwrap();
        assert!(view.lines.is_empty());
        assert_eq!(view.total, Money::zero());
    }

    #[tokio::test]
    async fn test_withdrawn_product_can_still_be_decremented_and_removed() {
        let f = setup().await;
        let user = f.user();
        f.service.add_line(user, "A".into(), 3).await.unwrap();
        f.service.add_line(user, "B".into(), 1).await.unwrap();

        f.store
            .put_product(Product::new("A", "Espresso", Money::from_cents(1000), 3).deactivated())
            .await
            .unwrap();

        let view = f.service.decrement_line(user, "A".into(), 1).await.unwrap();
        assert_eq!(view.lines[0].quantity, 2);

        let view = f.service.remove_line(user, "A".into()).await.unwrap();
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines[0].product_id, ProductId::new("B"));

        // Adding it back is still refused
        assert!(matches!(
            f.service.add_line(user, "A".into(), 1).await,
            Err(DomainError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_user_gets_no_cart() {
        let f = setup().await;
        let stranger = UserId::new();

        assert!(matches!(
            f.service.get_cart(stranger).await,
            Err(DomainError::NotFound { entity: "user", .. })
        ));
        assert!(matches!(
            f.service.add_line(stranger, "A".into(), 1).await,
            Err(DomainError::NotFound { entity: "user", .. })
        ));
        assert!(f.store.carts_for_user(stranger).await.is_empty());
    }
}
