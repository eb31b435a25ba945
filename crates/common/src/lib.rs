//! Shared vocabulary for the checkout pipeline: typed identifiers and money.

pub mod ids;
pub mod money;

pub use ids::{AddressId, CartId, OrderId, ProductId, UserId};
pub use money::Money;
