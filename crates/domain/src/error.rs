//! Domain error types.

use store::StoreError;
use thiserror::Error;

/// Errors that can occur during checkout, cart and order operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A user, product, order or cart line does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The operation is not allowed in the current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Not enough stock to satisfy the requested quantity.
    #[error("Sorry, product '{product_name}' is out of stock. Available: {available}")]
    OutOfStock {
        product_name: String,
        available: u32,
    },

    /// The request is missing a required value or carries an invalid one.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DomainError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Short label for the error kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::NotFound { .. } => "not_found",
            DomainError::InvalidState(_) => "invalid_state",
            DomainError::OutOfStock { .. } => "out_of_stock",
            DomainError::Validation(_) => "validation",
            DomainError::Store(_) => "store",
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_stock_message_names_product_and_availability() {
        let err = DomainError::OutOfStock {
            product_name: "Espresso".into(),
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "Sorry, product 'Espresso' is out of stock. Available: 2"
        );
        assert_eq!(err.kind(), "out_of_stock");
    }

    #[test]
    fn not_found_message() {
        let err = DomainError::not_found("order", "42");
        assert_eq!(err.to_string(), "order not found: 42");
    }
}
