//! Shared identifier types for the livestock marketplace.

mod types;

pub use types::{BuyerId, CategoryId, OrderId, ProductId, SellerId, UserId};
