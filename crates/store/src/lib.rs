//! Persistence for the checkout pipeline.
//!
//! The [`Store`] handle hands out [`StoreTx`] units of work. Exclusive row
//! locks taken inside a transaction are held until it commits, rolls back or
//! is dropped, which is what serialises concurrent checkouts of the same
//! product.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use common::{AddressId, CartId, Money, OrderId, ProductId, UserId};
pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryTx};
pub use model::{
    Cart, CartLine, CartStatus, Order, OrderLine, OrderStatus, PaymentMethod, PaymentStatus,
    Product, UnknownVariant,
};
pub use postgres::{PgTx, PostgresStore};
pub use store::{Store, StoreTx};
