//! Persistence layer for the livestock marketplace.
//!
//! [`Store`] bundles the per-entity store traits. Two backends implement it:
//! [`InMemoryStore`] for tests and local runs, and [`PostgresStore`] backed by `sqlx`.
//! Both enforce the same constraints: unique order numbers, unique category
//! names, one profile per user, and conditional stock decrements.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::{ProductPage, ProductQuery};
pub use store::{CategoryStore, OrderStore, ProductStore, ProfileStore, Store};
