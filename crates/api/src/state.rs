//! Shared application state.

use catalog::{CatalogService, ProfileService};
use orders::OrderEngine;
use store::Store;

/// Services shared by all handlers, built over one store.
pub struct AppState<S: Store> {
    pub catalog: CatalogService<S>,
    pub profiles: ProfileService<S>,
    pub orders: OrderEngine<S>,
}

impl<S: Store> AppState<S> {
    /// Wires the services so that order placement and product edits publish
    /// to the same catalog event bus.
    pub fn new(store: S) -> Self {
        let catalog = CatalogService::new(store.clone());
        let orders = OrderEngine::new(store.clone(), catalog.events().clone());
        let profiles = ProfileService::new(store);
        Self {
            catalog,
            profiles,
            orders,
        }
    }
}
