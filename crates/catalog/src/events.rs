//! Catalog events and the synchronous observer bus that delivers them.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use common::CategoryId;

use crate::Result;

/// Something in the catalog changed that derived data depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CatalogEvent {
    /// Stock, availability, or membership of products in this category changed.
    CategoryTouched { category_id: CategoryId },
}

impl CatalogEvent {
    pub fn category_touched(category_id: CategoryId) -> Self {
        CatalogEvent::CategoryTouched { category_id }
    }

    /// Returns the event type name, used in logs.
    pub fn event_type(&self) -> &'static str {
        match self {
            CatalogEvent::CategoryTouched { .. } => "CategoryTouched",
        }
    }
}

/// A consumer of catalog events.
#[async_trait]
pub trait CatalogObserver: Send + Sync {
    /// Returns the name of this observer.
    fn name(&self) -> &'static str;

    /// Handles a single event.
    async fn on_event(&self, event: &CatalogEvent) -> Result<()>;
}

/// Delivers catalog events to every subscribed observer, in order, before
/// returning to the publisher.
///
/// Derived data is best-effort consistent: an observer failure is logged and
/// does not undo the mutation that triggered it. The next event for the same
/// category, or an explicit recompute, repairs it.
#[derive(Clone, Default)]
pub struct CatalogEventBus {
    observers: Vec<Arc<dyn CatalogObserver>>,
}

impl CatalogEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer.
    pub fn subscribe(&mut self, observer: Arc<dyn CatalogObserver>) {
        self.observers.push(observer);
    }

    /// Returns the number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Delivers one event to all observers.
    ///
    /// Returns the number of observers that failed.
    #[tracing::instrument(skip(self, event), fields(event_type = event.event_type()))]
    pub async fn publish(&self, event: &CatalogEvent) -> usize {
        let mut failures = 0;
        for observer in &self.observers {
            if let Err(e) = observer.on_event(event).await {
                failures += 1;
                tracing::error!(
                    observer = observer.name(),
                    ?event,
                    error = %e,
                    "catalog observer failed"
                );
            }
        }
        failures
    }

    /// Publishes `CategoryTouched` once per distinct category.
    pub async fn touch_categories(&self, categories: impl IntoIterator<Item = CategoryId>) -> usize {
        let distinct: BTreeSet<_> = categories.into_iter().collect();
        let mut failures = 0;
        for category_id in distinct {
            failures += self
                .publish(&CatalogEvent::category_touched(category_id))
                .await;
        }
        failures
    }
}
