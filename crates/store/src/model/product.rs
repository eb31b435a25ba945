use common::{Money, ProductId};
use serde::{Deserialize, Serialize};

/// A sellable product and its stock counter.
///
/// The catalog owns everything here except `stock_quantity`, which checkout
/// decrements while holding the product's row lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub discount_price: Option<Money>,
    pub stock_quantity: u32,
    pub active: bool,
}

impl Product {
    /// Creates an active product without a discount.
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        price: Money,
        stock_quantity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            discount_price: None,
            stock_quantity,
            active: true,
        }
    }

    /// Sets a discount price.
    pub fn with_discount(mut self, discount_price: Money) -> Self {
        self.discount_price = Some(discount_price);
        self
    }

    /// Marks the product as unavailable for sale.
    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    /// The price a buyer pays right now: the discount price when set, else the base price.
    pub fn effective_price(&self) -> Money {
        self.discount_price.unwrap_or(self.price)
    }

    /// Removes `quantity` units from stock.
    ///
    /// Returns false and leaves stock untouched when fewer units are available.
    pub fn decrement_stock(&mut self, quantity: u32) -> bool {
        match self.stock_quantity.checked_sub(quantity) {
            Some(remaining) => {
                self.stock_quantity = remaining;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_price_prefers_discount() {
        let product = Product::new("SKU-B", "Soda", Money::from_cents(500), 1);
        assert_eq!(product.effective_price(), Money::from_cents(500));

        let product = product.with_discount(Money::from_cents(400));
        assert_eq!(product.effective_price(), Money::from_cents(400));
    }

    #[test]
    fn decrement_stock_never_goes_negative() {
        let mut product = Product::new("SKU-A", "Burger", Money::from_cents(1000), 3);

        assert!(product.decrement_stock(2));
        assert_eq!(product.stock_quantity, 1);

        assert!(!product.decrement_stock(2));
        assert_eq!(product.stock_quantity, 1);

        assert!(product.decrement_stock(1));
        assert_eq!(product.stock_quantity, 0);
    }
}
