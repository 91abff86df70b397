//! Order engine error types.

use common::OrderId;
use domain::{OrderStatus, TransitionError, ValidationError};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur in order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The caller's role or ownership does not allow the operation.
    #[error("{0}")]
    Forbidden(String),

    /// The cart or another input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A product cannot cover the requested quantity.
    #[error("Insufficient stock for {breed}")]
    InsufficientStock { breed: String },

    /// The requested status change is not part of the lifecycle.
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// Buyers may only cancel orders that are still pending.
    #[error("Only pending orders can be cancelled (current status: {status})")]
    NotCancellable { status: OrderStatus },

    /// The order changed between read and write.
    #[error("Order {order_id} was modified concurrently, retry the operation")]
    ConcurrentUpdate { order_id: OrderId },

    /// Every generated order number collided with an existing one.
    #[error("Could not allocate a unique order number after {attempts} attempts")]
    OrderNumberExhausted { attempts: u32 },

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl OrderError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        OrderError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn forbidden(message: impl Into<String>) -> Self {
        OrderError::Forbidden(message.into())
    }

    /// Short label used for the `reason` metric dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::Forbidden(_) => "forbidden",
            OrderError::Validation(_) => "validation",
            OrderError::NotFound { .. } => "not_found",
            OrderError::InsufficientStock { .. } => "insufficient_stock",
            OrderError::InvalidTransition(_) => "invalid_transition",
            OrderError::NotCancellable { .. } => "not_cancellable",
            OrderError::ConcurrentUpdate { .. } => "conflict",
            OrderError::OrderNumberExhausted { .. } => "order_number",
            OrderError::Store(_) => "store",
        }
    }
}

/// Convenience type alias for order results.
pub type Result<T> = std::result::Result<T, OrderError>;
