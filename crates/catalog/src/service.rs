//! Catalog service: products and categories.

use std::sync::Arc;

use common::{CategoryId, ProductId};
use domain::{
    Category, CategoryStats, Identity, NewProduct, Product, ProductPatch, Role, SellerSummary,
};
use store::{ProductPage, ProductQuery, Store, error::constraints};

use crate::events::CatalogEventBus;
use crate::recomputer::CategoryStockRecomputer;
use crate::{CatalogError, Result};

/// Category fields shown next to a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySummary {
    pub category_id: CategoryId,
    pub name: String,
}

/// A product with its seller and category resolved at read time.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDetails {
    pub product: Product,
    pub seller: Option<SellerSummary>,
    pub category: Option<CategorySummary>,
}

/// Product and category operations.
///
/// Every product mutation that can change a category's stock total publishes
/// `CategoryTouched` for the affected categories once the write is stored.
#[derive(Clone)]
pub struct CatalogService<S> {
    store: S,
    events: CatalogEventBus,
}

impl<S: Store> CatalogService<S> {
    /// Creates a service whose event bus feeds a [`CategoryStockRecomputer`].
    pub fn new(store: S) -> Self {
        let mut events = CatalogEventBus::new();
        events.subscribe(Arc::new(CategoryStockRecomputer::new(store.clone())));
        Self::with_events(store, events)
    }

    /// Creates a service publishing to a caller-supplied bus.
    pub fn with_events(store: S, events: CatalogEventBus) -> Self {
        Self { store, events }
    }

    /// Returns the event bus, for other services that mutate stock.
    pub fn events(&self) -> &CatalogEventBus {
        &self.events
    }

    /// Lists a new product for the calling seller.
    ///
    /// The caller must be an approved seller and the category must exist.
    #[tracing::instrument(skip(self, input), fields(user_id = %identity.user_id))]
    pub async fn create_product(&self, identity: &Identity, input: NewProduct) -> Result<Product> {
        if !identity.has_role(Role::Eleveur) {
            return Err(CatalogError::forbidden("Only sellers can list products"));
        }
        let seller = self
            .store
            .find_seller_by_user(identity.user_id)
            .await?
            .ok_or_else(|| CatalogError::not_found("SellerProfile", identity.user_id))?;
        if !seller.is_approved {
            return Err(CatalogError::forbidden(
                "Your seller profile must be approved before listing products",
            ));
        }
        if self.store.get_category(input.category_id).await?.is_none() {
            return Err(CatalogError::not_found("Category", input.category_id));
        }

        let product = Product::create(seller.id, input)?;
        self.store.insert_product(&product).await?;

        metrics::counter!("products_mutated_total", "operation" => "create").increment(1);
        tracing::info!(product_id = %product.id, category_id = %product.category_id, "product created");

        self.events.touch_categories([product.category_id]).await;
        Ok(product)
    }

    /// Applies a partial update to a product.
    ///
    /// A stale read surfaces as `StoreError::ConcurrencyConflict`.
    #[tracing::instrument(skip(self, patch), fields(user_id = %identity.user_id))]
    pub async fn update_product(
        &self,
        identity: &Identity,
        product_id: ProductId,
        patch: ProductPatch,
    ) -> Result<Product> {
        let current = self.load_product(product_id).await?;
        self.authorize_product_change(identity, &current).await?;

        if let Some(category_id) = patch.category_id
            && category_id != current.category_id
            && self.store.get_category(category_id).await?.is_none()
        {
            return Err(CatalogError::not_found("Category", category_id));
        }

        let touches_stock = patch.touches_stock();
        let updated = current.patched(patch)?;
        if !self.store.update_product(&updated, current.version).await? {
            return Err(CatalogError::not_found("Product", product_id));
        }

        metrics::counter!("products_mutated_total", "operation" => "update").increment(1);
        tracing::info!(%product_id, "product updated");

        if touches_stock {
            self.events
                .touch_categories([current.category_id, updated.category_id])
                .await;
        }
        Ok(updated)
    }

    /// Deletes a product and returns what was removed.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn delete_product(&self, identity: &Identity, product_id: ProductId) -> Result<Product> {
        let current = self.load_product(product_id).await?;
        self.authorize_product_change(identity, &current).await?;

        let removed = self
            .store
            .delete_product(product_id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Product", product_id))?;

        metrics::counter!("products_mutated_total", "operation" => "delete").increment(1);
        tracing::info!(%product_id, "product deleted");

        self.events.touch_categories([removed.category_id]).await;
        Ok(removed)
    }

    /// Returns one product with its seller and category summaries.
    pub async fn get_product(&self, product_id: ProductId) -> Result<ProductDetails> {
        let product = self.load_product(product_id).await?;
        let seller = self
            .store
            .get_seller(product.seller_id)
            .await?
            .map(|s| s.summary());
        let category = self
            .store
            .get_category(product.category_id)
            .await?
            .map(|c| CategorySummary {
                category_id: c.id,
                name: c.name,
            });
        Ok(ProductDetails {
            product,
            seller,
            category,
        })
    }

    /// Returns one page of the public listing.
    #[tracing::instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage> {
        Ok(self.store.query_products(query).await?)
    }

    /// Returns one page of the public listing of a single category.
    #[tracing::instrument(skip(self, query))]
    pub async fn list_products_by_category(
        &self,
        category_id: CategoryId,
        query: ProductQuery,
    ) -> Result<(Category, ProductPage)> {
        let category = self
            .store
            .get_category(category_id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Category", category_id))?;
        let page = self
            .store
            .query_products(&query.category(category_id))
            .await?;
        Ok((category, page))
    }

    /// Returns all of the calling seller's products, listed or not.
    pub async fn list_my_products(&self, identity: &Identity) -> Result<Vec<Product>> {
        if !identity.has_role(Role::Eleveur) {
            return Err(CatalogError::forbidden("Only sellers have products"));
        }
        let seller = self
            .store
            .find_seller_by_user(identity.user_id)
            .await?
            .ok_or_else(|| CatalogError::not_found("SellerProfile", identity.user_id))?;
        Ok(self.store.products_by_seller(seller.id).await?)
    }

    /// Returns active categories sorted by name.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.store.list_active_categories().await?)
    }

    /// Creates a category. Back-office roles only.
    #[tracing::instrument(skip(self, description), fields(user_id = %identity.user_id))]
    pub async fn create_category(
        &self,
        identity: &Identity,
        name: &str,
        description: Option<String>,
    ) -> Result<Category> {
        if !identity.role.is_elevated() {
            return Err(CatalogError::forbidden(
                "Only managers and administrators can create categories",
            ));
        }
        let category = Category::create(name, description)?;
        match self.store.insert_category(&category).await {
            Ok(()) => {
                tracing::info!(category_id = %category.id, name = %category.name, "category created");
                Ok(category)
            }
            Err(e) if e.is_unique_violation_of(constraints::CATEGORY_NAME) => Err(
                CatalogError::AlreadyExists(format!("Category '{}' already exists", category.name)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns per-category counters.
    pub async fn category_stats(&self) -> Result<Vec<CategoryStats>> {
        Ok(self.store.category_stats().await?)
    }

    /// Forces a recompute of one category's stock total. Back-office roles only.
    pub async fn recompute_category(
        &self,
        identity: &Identity,
        category_id: CategoryId,
    ) -> Result<u64> {
        if !identity.role.is_elevated() {
            return Err(CatalogError::forbidden(
                "Only managers and administrators can recompute categories",
            ));
        }
        CategoryStockRecomputer::new(self.store.clone())
            .recompute(category_id)
            .await
    }

    async fn load_product(&self, product_id: ProductId) -> Result<Product> {
        self.store
            .get_product(product_id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Product", product_id))
    }

    /// Owners and back-office roles may change a product.
    async fn authorize_product_change(&self, identity: &Identity, product: &Product) -> Result<()> {
        if identity.role.is_elevated() {
            return Ok(());
        }
        if identity.has_role(Role::Eleveur)
            && let Some(seller) = self.store.find_seller_by_user(identity.user_id).await?
            && seller.id == product.seller_id
        {
            return Ok(());
        }
        Err(CatalogError::forbidden("You can only modify your own products"))
    }
}
