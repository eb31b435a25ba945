use chrono::{DateTime, Utc};
use common::{CartId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use super::UnknownVariant;

/// Lifecycle of a cart.
///
/// ```text
/// Active ──► CheckedOut
/// ```
///
/// A checked-out cart is never reopened; the user's next interaction creates a
/// fresh active cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartStatus {
    #[default]
    Active,
    CheckedOut,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "ACTIVE",
            CartStatus::CheckedOut => "CHECKED_OUT",
        }
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CartStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(CartStatus::Active),
            "CHECKED_OUT" => Ok(CartStatus::CheckedOut),
            other => Err(UnknownVariant::new("cart status", other)),
        }
    }
}

/// One product in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    /// Always greater than zero; a line that would drop to zero is removed.
    pub quantity: u32,
}

/// A user's shopping cart.
///
/// Lines keep their insertion order, which the order's lines follow. Checkout
/// locks the products themselves in ascending id order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub(crate) id: CartId,
    pub(crate) user_id: UserId,
    pub(crate) status: CartStatus,
    pub(crate) lines: Vec<CartLine>,
    pub(crate) created_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty active cart for a user.
    pub fn new(user_id: UserId) -> Self {
        Self {
            id: CartId::new(),
            user_id,
            status: CartStatus::Active,
            lines: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> CartId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn status(&self) -> CartStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_active(&self) -> bool {
        self.status == CartStatus::Active
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the line for a product, if present.
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.product_id == product_id)
    }

    /// Returns the quantity already in the cart for a product (zero if absent).
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.line(product_id).map_or(0, |line| line.quantity)
    }

    /// Adds units of a product, appending a new line or growing the existing one.
    ///
    /// Returns the resulting line quantity, which saturates at `u32::MAX`.
    pub fn add_quantity(&mut self, product_id: ProductId, quantity: u32) -> u32 {
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
        {
            line.quantity = line.quantity.saturating_add(quantity);
            return line.quantity;
        }

        self.lines.push(CartLine {
            product_id,
            quantity,
        });
        quantity
    }

    /// Removes units of a product, dropping the line when nothing is left.
    ///
    /// Returns the remaining quantity, or `None` if the product is not in the cart.
    pub fn decrement_quantity(&mut self, product_id: &ProductId, quantity: u32) -> Option<u32> {
        let index = self
            .lines
            .iter()
            .position(|line| &line.product_id == product_id)?;

        let remaining = self.lines[index].quantity.saturating_sub(quantity);
        if remaining == 0 {
            self.lines.remove(index);
        } else {
            self.lines[index].quantity = remaining;
        }
        Some(remaining)
    }

    /// Removes a product's line. Returns false if it was not in the cart.
    pub fn remove_line(&mut self, product_id: &ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| &line.product_id != product_id);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Closes the cart after a successful checkout.
    pub fn mark_checked_out(&mut self) {
        self.status = CartStatus::CheckedOut;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sku(id: &str) -> ProductId {
        ProductId::new(id)
    }

    #[test]
    fn new_cart_is_active_and_empty() {
        let cart = Cart::new(UserId::new());
        assert!(cart.is_active());
        assert!(cart.is_empty());
    }

    #[test]
    fn add_quantity_merges_into_existing_line() {
        let mut cart = Cart::new(UserId::new());
        assert_eq!(cart.add_quantity(sku("A"), 2), 2);
        assert_eq!(cart.add_quantity(sku("B"), 1), 1);
        assert_eq!(cart.add_quantity(sku("A"), 3), 5);

        let order: Vec<_> = cart.lines().iter().map(|l| l.product_id.as_str()).collect();
        assert_eq!(order, vec!["A", "B"]);
        assert_eq!(cart.quantity_of(&sku("A")), 5);
    }

    #[test]
    fn add_quantity_saturates_instead_of_overflowing() {
        let mut cart = Cart::new(UserId::new());
        cart.add_quantity(sku("A"), u32::MAX - 1);
        assert_eq!(cart.add_quantity(sku("A"), 5), u32::MAX);
        assert_eq!(cart.quantity_of(&sku("A")), u32::MAX);
    }

    #[test]
    fn decrement_removes_line_at_zero_or_below() {
        let mut cart = Cart::new(UserId::new());
        cart.add_quantity(sku("A"), 3);

        assert_eq!(cart.decrement_quantity(&sku("A"), 1), Some(2));
        assert_eq!(cart.decrement_quantity(&sku("A"), 5), Some(0));
        assert!(cart.line(&sku("A")).is_none());
        assert_eq!(cart.decrement_quantity(&sku("A"), 1), None);
    }

    #[test]
    fn remove_and_clear() {
        let mut cart = Cart::new(UserId::new());
        cart.add_quantity(sku("A"), 1);
        cart.add_quantity(sku("B"), 1);

        assert!(cart.remove_line(&sku("A")));
        assert!(!cart.remove_line(&sku("A")));
        assert_eq!(cart.lines().len(), 1);

        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn checkout_closes_the_cart() {
        let mut cart = Cart::new(UserId::new());
        cart.mark_checked_out();
        assert_eq!(cart.status(), CartStatus::CheckedOut);
        assert!(!cart.is_active());
    }

    #[test]
    fn status_labels_round_trip() {
        for status in [CartStatus::Active, CartStatus::CheckedOut] {
            assert_eq!(status.as_str().parse::<CartStatus>().unwrap(), status);
        }
        assert!("OPEN".parse::<CartStatus>().is_err());
    }
}
