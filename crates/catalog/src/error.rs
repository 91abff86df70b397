//! Catalog error types.

use domain::ValidationError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur in catalog and profile operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The caller's role or ownership does not allow the operation.
    #[error("{0}")]
    Forbidden(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A uniquely named or per-user entity already exists.
    #[error("{0}")]
    AlreadyExists(String),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CatalogError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CatalogError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn forbidden(message: impl Into<String>) -> Self {
        CatalogError::Forbidden(message.into())
    }
}

/// Convenience type alias for catalog results.
pub type Result<T> = std::result::Result<T, CatalogError>;
