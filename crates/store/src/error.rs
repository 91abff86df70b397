use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// The row changed since it was read.
    #[error("Concurrent update of {entity} {id}")]
    ConcurrencyConflict { entity: &'static str, id: String },

    /// Restocking would push the stock past `u32::MAX` units.
    #[error("Stock of product {product_id} would overflow")]
    StockOverflow { product_id: String },

    /// A stored value could not be mapped back to a domain type.
    #[error("Corrupt {entity} row: {reason}")]
    Corrupt { entity: &'static str, reason: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true if the error is a violation of `constraint`.
    pub fn is_unique_violation_of(&self, constraint: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint: c } if c == constraint)
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Constraint names shared by both backends.
pub mod constraints {
    pub const ORDER_NUMBER: &str = "orders_order_number_key";
    pub const CATEGORY_NAME: &str = "categories_name_key";
    pub const BUYER_USER: &str = "buyer_profiles_user_id_key";
    pub const SELLER_USER: &str = "seller_profiles_user_id_key";
    pub const PRODUCT_STOCK: &str = "products_stock_check";
}
