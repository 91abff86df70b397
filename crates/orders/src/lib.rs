//! Order engine for the livestock marketplace.
//!
//! [`OrderEngine`] turns a buyer's cart into a persisted order and drives the
//! order through its lifecycle. Placement never oversells: stock is taken with
//! conditional decrements and a failed reservation is compensated.

pub mod engine;
pub mod error;
pub mod number;
mod placement;

pub use engine::{CartItem, OrderEngine, OrderView, PlaceOrderRequest};
pub use error::{OrderError, Result};
pub use number::{OrderNumberGenerator, TimestampOrderNumbers};
pub use placement::ORDER_NUMBER_ATTEMPTS;
