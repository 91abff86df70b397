//! Domain layer for the livestock marketplace.
//!
//! This crate holds the entities and rules shared by every service, with no I/O:
//! - Products and categories, with field validation
//! - The order snapshot and its status state machine
//! - Identities, roles, and buyer/seller profiles

pub mod category;
pub mod error;
pub mod identity;
pub mod order;
pub mod product;
pub mod value_objects;

pub use category::{Category, CategoryStats};
pub use common::{BuyerId, CategoryId, OrderId, ProductId, SellerId, UserId};
pub use error::{TransitionError, ValidationError};
pub use identity::{
    BuyerKind, BuyerProfile, BuyerSummary, Identity, Role, SellerProfile, SellerSummary,
};
pub use order::{
    LineItem, Order, OrderNumber, OrderRecord, OrderStatus, PaymentMethod, PaymentStatus,
    PlaceOrder,
};
pub use product::{NewProduct, Product, ProductPatch};
pub use value_objects::{Address, Money};
