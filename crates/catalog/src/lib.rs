//! Product catalog, categories, and profiles for the livestock marketplace.
//!
//! This crate provides the seller-facing side of the marketplace:
//! - [`CatalogService`] for product CRUD, public listings, and categories
//! - [`ProfileService`] for buyer/seller profiles and seller approval
//! - [`CatalogEventBus`] and [`CatalogObserver`] for reacting to catalog changes
//! - [`CategoryStockRecomputer`], the observer keeping category stock totals derived

pub mod error;
pub mod events;
pub mod profiles;
pub mod recomputer;
pub mod service;

pub use error::{CatalogError, Result};
pub use events::{CatalogEvent, CatalogEventBus, CatalogObserver};
pub use profiles::{Profile, ProfileService};
pub use recomputer::CategoryStockRecomputer;
pub use service::{CatalogService, CategorySummary, ProductDetails};
