//! Domain layer for the checkout pipeline.
//!
//! This crate provides the business rules on top of the `store` crate:
//! - [`CartService`] for the user's single active cart
//! - [`CheckoutService`] turning a cart into an order under row locks
//! - [`OrderService`] for administrator status changes and order queries
//! - [`OrderEvent`] and the [`EventPublisher`] port used after commit

pub mod cart;
pub mod checkout;
pub mod directory;
pub mod error;
pub mod events;
pub mod order;
pub mod snapshot;

pub use cart::{CartService, CartView, CartViewLine};
pub use checkout::{CheckoutConfig, CheckoutService, PlaceOrder, ShippingDestination};
pub use directory::{
    Address, AddressBook, InMemoryAddressBook, InMemoryUserDirectory, User, UserDirectory,
};
pub use error::{DomainError, Result};
pub use events::{
    DomainEvent, EventPublisher, NoopPublisher, OrderEvent, OrderPlacedData,
    OrderStatusChangedData, RecordingPublisher,
};
pub use order::{OrderService, UpdateOrderStatus};
pub use snapshot::{OrderItemSnapshot, OrderSnapshot};
