use async_trait::async_trait;
use common::{BuyerId, CategoryId, OrderId, ProductId, SellerId, UserId};
use domain::{BuyerProfile, Category, CategoryStats, Order, OrderStatus, Product, SellerProfile};

use crate::{ProductPage, ProductQuery, Result};

/// Buyer and seller profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Inserts a buyer profile; a second profile for the same user is a
    /// `UniqueViolation`.
    async fn insert_buyer(&self, profile: &BuyerProfile) -> Result<()>;

    /// Inserts a seller profile; a second profile for the same user is a
    /// `UniqueViolation`.
    async fn insert_seller(&self, profile: &SellerProfile) -> Result<()>;

    async fn get_buyer(&self, buyer_id: BuyerId) -> Result<Option<BuyerProfile>>;

    async fn get_seller(&self, seller_id: SellerId) -> Result<Option<SellerProfile>>;

    async fn find_buyer_by_user(&self, user_id: UserId) -> Result<Option<BuyerProfile>>;

    async fn find_seller_by_user(&self, user_id: UserId) -> Result<Option<SellerProfile>>;

    /// Sets the approval flag; returns the updated profile, or None if absent.
    async fn set_seller_approval(
        &self,
        seller_id: SellerId,
        approved: bool,
    ) -> Result<Option<SellerProfile>>;
}

/// Product categories.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// Inserts a category; duplicate names are a `UniqueViolation`.
    async fn insert_category(&self, category: &Category) -> Result<()>;

    async fn get_category(&self, category_id: CategoryId) -> Result<Option<Category>>;

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// Returns active categories sorted by name.
    async fn list_active_categories(&self) -> Result<Vec<Category>>;

    /// Recomputes the derived stock total from the available products of the
    /// category in a single store operation and returns it, or None if the
    /// category is absent.
    async fn recompute_category_stock(&self, category_id: CategoryId) -> Result<Option<u64>>;

    /// Returns per-category product counters, sorted by name.
    async fn category_stats(&self) -> Result<Vec<CategoryStats>>;
}

/// Catalog products and their stock.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert_product(&self, product: &Product) -> Result<()>;

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// Replaces a product if its stored version is still `expected_version`.
    ///
    /// Returns false if the product is absent and `ConcurrencyConflict` if
    /// another write got there first.
    async fn update_product(&self, product: &Product, expected_version: i64) -> Result<bool>;

    /// Deletes a product, returning what was removed.
    async fn delete_product(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// Returns one page of listed products matching `query`.
    async fn query_products(&self, query: &ProductQuery) -> Result<ProductPage>;

    /// Returns every product of a seller, newest first, listed or not.
    async fn products_by_seller(&self, seller_id: SellerId) -> Result<Vec<Product>>;

    /// Removes `quantity` units in a single atomic step, only if the product
    /// is available and holds at least that many.
    ///
    /// Returns false, leaving the product untouched, when the condition fails.
    async fn decrement_stock_if_available(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<bool>;

    /// Adds `quantity` units back; returns false if the product is absent.
    async fn restock(&self, product_id: ProductId, quantity: u32) -> Result<bool>;
}

/// Orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts an order; a reused order number is a `UniqueViolation`.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Persists the mutable part of an order (status, payment status, notes)
    /// if its stored status is still `expected`.
    ///
    /// Returns false if the order is absent or its status moved on.
    async fn update_order_status(&self, order: &Order, expected: OrderStatus) -> Result<bool>;

    /// Returns a buyer's orders, newest first.
    async fn orders_for_buyer(&self, buyer_id: BuyerId) -> Result<Vec<Order>>;

    /// Returns the orders assigned to a seller, newest first.
    async fn orders_for_seller(&self, seller_id: SellerId) -> Result<Vec<Order>>;
}

/// Everything the marketplace services need from persistence.
pub trait Store: ProfileStore + CategoryStore + ProductStore + OrderStore + Clone + 'static {}

impl<T> Store for T where
    T: ProfileStore + CategoryStore + ProductStore + OrderStore + Clone + 'static
{
}
