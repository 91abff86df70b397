//! Domain error types.

use thiserror::Error;

use crate::order::OrderStatus;

/// Malformed or missing input, reported verbatim to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The cart has no line items.
    #[error("Order must contain at least one item")]
    EmptyCart,

    /// A cart line asked for zero units.
    #[error("Invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: i64 },

    /// The cart mixes products from several sellers.
    #[error("All items of an order must come from the same seller")]
    MixedSellers,

    /// The computed total does not fit the amount type.
    #[error("Order total is too large")]
    TotalOverflow,

    /// A single field failed a constraint.
    #[error("{field} {reason}")]
    Field { field: &'static str, reason: String },
}

impl ValidationError {
    /// Builds a field-level validation error.
    pub fn field(field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::Field {
            field,
            reason: reason.into(),
        }
    }
}

/// An order status change that the lifecycle does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid status transition: cannot move from {from} to {to}")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}
