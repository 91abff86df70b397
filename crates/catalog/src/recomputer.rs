//! Keeps `Category::stock_total` in line with the products of the category.

use async_trait::async_trait;
use common::CategoryId;
use store::CategoryStore;

use crate::events::{CatalogEvent, CatalogObserver};
use crate::{CatalogError, Result};

/// Recomputes a category's derived stock total whenever it is touched.
///
/// The recompute is a single store operation that reads the current products,
/// so repeated and concurrent calls converge on the same value.
#[derive(Clone)]
pub struct CategoryStockRecomputer<S> {
    store: S,
}

impl<S: CategoryStore> CategoryStockRecomputer<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Recomputes and stores the stock total of one category, returning it.
    #[tracing::instrument(skip_all, fields(%category_id))]
    pub async fn recompute(&self, category_id: CategoryId) -> Result<u64> {
        let total = self
            .store
            .recompute_category_stock(category_id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Category", category_id))?;

        metrics::counter!("category_recomputations_total").increment(1);
        tracing::debug!(stock_total = total, "category stock recomputed");
        Ok(total)
    }
}

#[async_trait]
impl<S: CategoryStore> CatalogObserver for CategoryStockRecomputer<S> {
    fn name(&self) -> &'static str {
        "CategoryStockRecomputer"
    }

    async fn on_event(&self, event: &CatalogEvent) -> Result<()> {
        match event {
            CatalogEvent::CategoryTouched { category_id } => {
                match self.recompute(*category_id).await {
                    Ok(_) => Ok(()),
                    // Products may still point at a category that was never created.
                    Err(CatalogError::NotFound { .. }) => {
                        tracing::warn!(%category_id, "touched category does not exist");
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }
}
