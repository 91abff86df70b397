use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{BuyerId, CategoryId, OrderId, ProductId, SellerId, UserId};
use domain::{
    BuyerProfile, Category, CategoryStats, Order, OrderStatus, Product, SellerProfile,
};
use tokio::sync::RwLock;

use crate::{
    ProductPage, ProductQuery, Result, StoreError,
    error::constraints,
    store::{CategoryStore, OrderStore, ProductStore, ProfileStore},
};

/// In-memory store implementation for tests and database-less runs.
///
/// Each entity lives in its own map behind a `RwLock`; every write that must
/// be atomic (conditional decrement, versioned update, unique insert) happens
/// under a single write guard.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    buyers: Arc<RwLock<HashMap<BuyerId, BuyerProfile>>>,
    sellers: Arc<RwLock<HashMap<SellerId, SellerProfile>>>,
    categories: Arc<RwLock<HashMap<CategoryId, Category>>>,
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Clears all data.
    pub async fn clear(&self) {
        self.buyers.write().await.clear();
        self.sellers.write().await.clear();
        self.categories.write().await.clear();
        self.products.write().await.clear();
        self.orders.write().await.clear();
    }
}

fn unique_violation(constraint: &str) -> StoreError {
    tracing::debug!(constraint, "unique constraint violated");
    StoreError::UniqueViolation {
        constraint: constraint.to_string(),
    }
}

fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> chrono::DateTime<Utc>) {
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn insert_buyer(&self, profile: &BuyerProfile) -> Result<()> {
        let mut buyers = self.buyers.write().await;
        if buyers.values().any(|b| b.user_id == profile.user_id) {
            return Err(unique_violation(constraints::BUYER_USER));
        }
        buyers.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn insert_seller(&self, profile: &SellerProfile) -> Result<()> {
        let mut sellers = self.sellers.write().await;
        if sellers.values().any(|s| s.user_id == profile.user_id) {
            return Err(unique_violation(constraints::SELLER_USER));
        }
        sellers.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn get_buyer(&self, buyer_id: BuyerId) -> Result<Option<BuyerProfile>> {
        Ok(self.buyers.read().await.get(&buyer_id).cloned())
    }

    async fn get_seller(&self, seller_id: SellerId) -> Result<Option<SellerProfile>> {
        Ok(self.sellers.read().await.get(&seller_id).cloned())
    }

    async fn find_buyer_by_user(&self, user_id: UserId) -> Result<Option<BuyerProfile>> {
        let buyers = self.buyers.read().await;
        Ok(buyers.values().find(|b| b.user_id == user_id).cloned())
    }

    async fn find_seller_by_user(&self, user_id: UserId) -> Result<Option<SellerProfile>> {
        let sellers = self.sellers.read().await;
        Ok(sellers.values().find(|s| s.user_id == user_id).cloned())
    }

    async fn set_seller_approval(
        &self,
        seller_id: SellerId,
        approved: bool,
    ) -> Result<Option<SellerProfile>> {
        let mut sellers = self.sellers.write().await;
        Ok(sellers.get_mut(&seller_id).map(|seller| {
            seller.is_approved = approved;
            seller.updated_at = Utc::now();
            seller.clone()
        }))
    }
}

#[async_trait]
impl CategoryStore for InMemoryStore {
    async fn insert_category(&self, category: &Category) -> Result<()> {
        let mut categories = self.categories.write().await;
        if categories.values().any(|c| c.name == category.name) {
            return Err(unique_violation(constraints::CATEGORY_NAME));
        }
        categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn get_category(&self, category_id: CategoryId) -> Result<Option<Category>> {
        Ok(self.categories.read().await.get(&category_id).cloned())
    }

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let categories = self.categories.read().await;
        Ok(categories.values().find(|c| c.name == name).cloned())
    }

    async fn list_active_categories(&self) -> Result<Vec<Category>> {
        let categories = self.categories.read().await;
        let mut active: Vec<_> = categories.values().filter(|c| c.is_active).cloned().collect();
        active.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(active)
    }

    async fn recompute_category_stock(&self, category_id: CategoryId) -> Result<Option<u64>> {
        // Categories before products, as in `category_stats`.
        let mut categories = self.categories.write().await;
        let Some(category) = categories.get_mut(&category_id) else {
            return Ok(None);
        };
        let products = self.products.read().await;
        let total = products
            .values()
            .filter(|p| p.category_id == category_id && p.is_available)
            .map(|p| u64::from(p.stock))
            .sum();
        category.stock_total = total;
        category.updated_at = Utc::now();
        Ok(Some(total))
    }

    async fn category_stats(&self) -> Result<Vec<CategoryStats>> {
        let categories = self.categories.read().await;
        let products = self.products.read().await;

        let mut stats: Vec<_> = categories
            .values()
            .map(|category| {
                let in_category = products.values().filter(|p| p.category_id == category.id);
                let (product_count, available_product_count) =
                    in_category.fold((0u64, 0u64), |(all, available), p| {
                        (all + 1, available + u64::from(p.is_available))
                    });
                CategoryStats {
                    category_id: category.id,
                    name: category.name.clone(),
                    description: category.description.clone(),
                    stock_total: category.stock_total,
                    product_count,
                    available_product_count,
                }
            })
            .collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(stats)
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        self.products
            .write()
            .await
            .insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(&product_id).cloned())
    }

    async fn update_product(&self, product: &Product, expected_version: i64) -> Result<bool> {
        let mut products = self.products.write().await;
        let Some(stored) = products.get_mut(&product.id) else {
            return Ok(false);
        };
        if stored.version != expected_version {
            return Err(StoreError::ConcurrencyConflict {
                entity: "product",
                id: product.id.to_string(),
            });
        }
        *stored = product.clone();
        Ok(true)
    }

    async fn delete_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self.products.write().await.remove(&product_id))
    }

    async fn query_products(&self, query: &ProductQuery) -> Result<ProductPage> {
        let products = self.products.read().await;
        let mut matching: Vec<_> = products
            .values()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        newest_first(&mut matching, |p| p.created_at);

        let total = matching.len() as u64;
        let stock_sum = matching.iter().map(|p| u64::from(p.stock)).sum();
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let products = matching
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .collect();

        Ok(ProductPage {
            products,
            page: query.page,
            limit: query.limit,
            total,
            stock_sum,
        })
    }

    async fn products_by_seller(&self, seller_id: SellerId) -> Result<Vec<Product>> {
        let products = self.products.read().await;
        let mut owned: Vec<_> = products
            .values()
            .filter(|p| p.seller_id == seller_id)
            .cloned()
            .collect();
        newest_first(&mut owned, |p| p.created_at);
        Ok(owned)
    }

    async fn decrement_stock_if_available(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<bool> {
        let mut products = self.products.write().await;
        match products.get_mut(&product_id) {
            Some(product) if product.can_fulfill(quantity) => {
                product.stock -= quantity;
                product.version += 1;
                product.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn restock(&self, product_id: ProductId, quantity: u32) -> Result<bool> {
        let mut products = self.products.write().await;
        let Some(product) = products.get_mut(&product_id) else {
            return Ok(false);
        };
        let Some(stock) = product.stock.checked_add(quantity) else {
            tracing::warn!(%product_id, quantity, "restock would overflow stock");
            return Err(StoreError::StockOverflow {
                product_id: product_id.to_string(),
            });
        };
        product.stock = stock;
        product.version += 1;
        product.updated_at = Utc::now();
        Ok(true)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        if orders
            .values()
            .any(|o| o.order_number() == order.order_number())
        {
            return Err(unique_violation(constraints::ORDER_NUMBER));
        }
        orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn update_order_status(&self, order: &Order, expected: OrderStatus) -> Result<bool> {
        let mut orders = self.orders.write().await;
        let Some(stored) = orders.get_mut(&order.id()) else {
            return Ok(false);
        };
        if stored.status() != expected {
            return Ok(false);
        }
        // Only the mutable part is taken over; the snapshot stays as placed.
        let mut record = stored.to_record();
        record.status = order.status();
        record.payment_status = order.payment_status();
        record.notes = order.notes().map(str::to_string);
        record.updated_at = order.updated_at();
        *stored = Order::from(record);
        Ok(true)
    }

    async fn orders_for_buyer(&self, buyer_id: BuyerId) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut found: Vec<_> = orders
            .values()
            .filter(|o| o.buyer_id() == buyer_id)
            .cloned()
            .collect();
        newest_first(&mut found, Order::created_at);
        Ok(found)
    }

    async fn orders_for_seller(&self, seller_id: SellerId) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut found: Vec<_> = orders
            .values()
            .filter(|o| o.seller_id() == Some(seller_id))
            .cloned()
            .collect();
        newest_first(&mut found, Order::created_at);
        Ok(found)
    }
}
