//! Orders: the placed-cart snapshot and its status machine.

mod aggregate;
mod state;

pub use aggregate::{LineItem, Order, OrderNumber, OrderRecord, PlaceOrder};
pub use state::{OrderStatus, PaymentMethod, PaymentStatus};
