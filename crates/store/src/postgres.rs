use async_trait::async_trait;
use common::{BuyerId, CategoryId, OrderId, ProductId, SellerId, UserId};
use domain::{
    Address, BuyerKind, BuyerProfile, Category, CategoryStats, LineItem, Money, Order,
    OrderNumber, OrderRecord, OrderStatus, PaymentMethod, PaymentStatus, Product, SellerProfile,
};
use sqlx::{
    PgPool, Postgres, Row,
    postgres::{PgArguments, PgRow},
    query::Query,
};
use uuid::Uuid;

use crate::{
    ProductPage, ProductQuery, Result, StoreError,
    error::constraints,
    store::{CategoryStore, OrderStore, ProductStore, ProfileStore},
};

const PRODUCT_COLUMNS: &str = "id, seller_id, category_id, breed, age_weeks, weight_kg, price, \
     description, images, is_available, stock, version, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, order_number, buyer_id, seller_id, items, total_amount, status, \
     payment_method, payment_status, delivery_address, notes, created_at, updated_at";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_buyer(row: PgRow) -> Result<BuyerProfile> {
        let kind: String = row.try_get("kind")?;
        let address: serde_json::Value = row.try_get("delivery_address")?;
        Ok(BuyerProfile {
            id: BuyerId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            kind: kind
                .parse::<BuyerKind>()
                .map_err(|e| corrupt("buyer_profile", e))?,
            delivery_address: serde_json::from_value::<Address>(address)?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_seller(row: PgRow) -> Result<SellerProfile> {
        Ok(SellerProfile {
            id: SellerId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            farm_name: row.try_get("farm_name")?,
            farm_city: row.try_get("farm_city")?,
            description: row.try_get("description")?,
            is_approved: row.try_get("is_approved")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_category(row: PgRow) -> Result<Category> {
        let stock_total: i64 = row.try_get("stock_total")?;
        Ok(Category {
            id: CategoryId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            is_active: row.try_get("is_active")?,
            stock_total: non_negative("category", stock_total)?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        let age_weeks: i32 = row.try_get("age_weeks")?;
        let stock: i64 = row.try_get("stock")?;
        let images: serde_json::Value = row.try_get("images")?;
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            seller_id: SellerId::from_uuid(row.try_get::<Uuid, _>("seller_id")?),
            category_id: CategoryId::from_uuid(row.try_get::<Uuid, _>("category_id")?),
            breed: row.try_get("breed")?,
            age_weeks: u32::try_from(age_weeks).map_err(|e| corrupt("product", e))?,
            weight_kg: row.try_get("weight_kg")?,
            price: Money::from_units(row.try_get("price")?),
            description: row.try_get("description")?,
            images: serde_json::from_value(images)?,
            is_available: row.try_get("is_available")?,
            stock: u32::try_from(stock).map_err(|e| corrupt("product", e))?,
            version: row.try_get("version")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let items: serde_json::Value = row.try_get("items")?;
        let address: serde_json::Value = row.try_get("delivery_address")?;
        let status: String = row.try_get("status")?;
        let payment_method: String = row.try_get("payment_method")?;
        let payment_status: String = row.try_get("payment_status")?;
        let order_number: String = row.try_get("order_number")?;

        let record = OrderRecord {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_number: OrderNumber::from_stored(order_number),
            buyer_id: BuyerId::from_uuid(row.try_get::<Uuid, _>("buyer_id")?),
            seller_id: row
                .try_get::<Option<Uuid>, _>("seller_id")?
                .map(SellerId::from_uuid),
            items: serde_json::from_value::<Vec<LineItem>>(items)?,
            total_amount: Money::from_units(row.try_get("total_amount")?),
            status: status
                .parse::<OrderStatus>()
                .map_err(|e| corrupt("order", e))?,
            payment_method: payment_method
                .parse::<PaymentMethod>()
                .map_err(|e| corrupt("order", e))?,
            payment_status: payment_status
                .parse::<PaymentStatus>()
                .map_err(|e| corrupt("order", e))?,
            delivery_address: serde_json::from_value::<Address>(address)?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        };
        Ok(Order::from(record))
    }
}

fn corrupt(entity: &'static str, reason: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt {
        entity,
        reason: reason.to_string(),
    }
}

fn non_negative(entity: &'static str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|e| corrupt(entity, e))
}

/// Maps a named unique-constraint failure to `UniqueViolation`.
fn map_unique(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
        && let Some(constraint) = db_err.constraint()
    {
        tracing::debug!(constraint, "unique constraint violated");
        return StoreError::UniqueViolation {
            constraint: constraint.to_string(),
        };
    }
    StoreError::Database(e)
}

/// Maps the stock ceiling check to `StockOverflow`.
fn map_stock_overflow(e: sqlx::Error, product_id: ProductId) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_check_violation()
        && db_err.constraint() == Some(constraints::PRODUCT_STOCK)
    {
        tracing::warn!(%product_id, "restock would overflow stock");
        return StoreError::StockOverflow {
            product_id: product_id.to_string(),
        };
    }
    StoreError::Database(e)
}

/// Appends the listing filters of `query` to `sql`, numbering from `$1`.
fn push_product_filters(sql: &mut String, query: &ProductQuery) -> usize {
    let mut param_count = 0;
    sql.push_str(" WHERE is_available AND stock > 0");
    if query.category_id.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND category_id = ${param_count}"));
    }
    if query.seller_id.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND seller_id = ${param_count}"));
    }
    if query.min_price.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND price >= ${param_count}"));
    }
    if query.max_price.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND price <= ${param_count}"));
    }
    param_count
}

fn bind_product_filters<'q>(
    mut sqlx_query: Query<'q, Postgres, PgArguments>,
    query: &ProductQuery,
) -> Query<'q, Postgres, PgArguments> {
    if let Some(category_id) = query.category_id {
        sqlx_query = sqlx_query.bind(category_id.as_uuid());
    }
    if let Some(seller_id) = query.seller_id {
        sqlx_query = sqlx_query.bind(seller_id.as_uuid());
    }
    if let Some(min) = query.min_price {
        sqlx_query = sqlx_query.bind(min.units());
    }
    if let Some(max) = query.max_price {
        sqlx_query = sqlx_query.bind(max.units());
    }
    sqlx_query
}

#[async_trait]
impl ProfileStore for PostgresStore {
    async fn insert_buyer(&self, profile: &BuyerProfile) -> Result<()> {
        let address = serde_json::to_value(&profile.delivery_address)?;
        sqlx::query(
            r#"
            INSERT INTO buyer_profiles (id, user_id, kind, delivery_address, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(profile.id.as_uuid())
        .bind(profile.user_id.as_uuid())
        .bind(profile.kind.as_str())
        .bind(address)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;
        Ok(())
    }

    async fn insert_seller(&self, profile: &SellerProfile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO seller_profiles
                (id, user_id, farm_name, farm_city, description, is_approved, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(profile.id.as_uuid())
        .bind(profile.user_id.as_uuid())
        .bind(&profile.farm_name)
        .bind(&profile.farm_city)
        .bind(&profile.description)
        .bind(profile.is_approved)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;
        Ok(())
    }

    async fn get_buyer(&self, buyer_id: BuyerId) -> Result<Option<BuyerProfile>> {
        sqlx::query("SELECT * FROM buyer_profiles WHERE id = $1")
            .bind(buyer_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_buyer)
            .transpose()
    }

    async fn get_seller(&self, seller_id: SellerId) -> Result<Option<SellerProfile>> {
        sqlx::query("SELECT * FROM seller_profiles WHERE id = $1")
            .bind(seller_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_seller)
            .transpose()
    }

    async fn find_buyer_by_user(&self, user_id: UserId) -> Result<Option<BuyerProfile>> {
        sqlx::query("SELECT * FROM buyer_profiles WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_buyer)
            .transpose()
    }

    async fn find_seller_by_user(&self, user_id: UserId) -> Result<Option<SellerProfile>> {
        sqlx::query("SELECT * FROM seller_profiles WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_seller)
            .transpose()
    }

    async fn set_seller_approval(
        &self,
        seller_id: SellerId,
        approved: bool,
    ) -> Result<Option<SellerProfile>> {
        sqlx::query(
            r#"
            UPDATE seller_profiles SET is_approved = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(seller_id.as_uuid())
        .bind(approved)
        .fetch_optional(&self.pool)
        .await?
        .map(Self::row_to_seller)
        .transpose()
    }
}

#[async_trait]
impl CategoryStore for PostgresStore {
    async fn insert_category(&self, category: &Category) -> Result<()> {
        let stock_total = i64::try_from(category.stock_total).map_err(|e| corrupt("category", e))?;
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, is_active, stock_total, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.is_active)
        .bind(stock_total)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;
        Ok(())
    }

    async fn get_category(&self, category_id: CategoryId) -> Result<Option<Category>> {
        sqlx::query("SELECT * FROM categories WHERE id = $1")
            .bind(category_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_category)
            .transpose()
    }

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        sqlx::query("SELECT * FROM categories WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_category)
            .transpose()
    }

    async fn list_active_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT * FROM categories WHERE is_active ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_category).collect()
    }

    async fn recompute_category_stock(&self, category_id: CategoryId) -> Result<Option<u64>> {
        let total: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE categories SET
                stock_total = (
                    SELECT COALESCE(SUM(stock), 0)::BIGINT FROM products
                    WHERE category_id = $1 AND is_available
                ),
                updated_at = NOW()
            WHERE id = $1
            RETURNING stock_total
            "#,
        )
        .bind(category_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        total.map(|t| non_negative("category", t)).transpose()
    }

    async fn category_stats(&self) -> Result<Vec<CategoryStats>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.name, c.description, c.stock_total,
                   COUNT(p.id) AS product_count,
                   COUNT(p.id) FILTER (WHERE p.is_available) AS available_product_count
            FROM categories c
            LEFT JOIN products p ON p.category_id = c.id
            GROUP BY c.id
            ORDER BY c.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(CategoryStats {
                    category_id: CategoryId::from_uuid(row.try_get::<Uuid, _>("id")?),
                    name: row.try_get("name")?,
                    description: row.try_get("description")?,
                    stock_total: non_negative("category", row.try_get("stock_total")?)?,
                    product_count: non_negative("category", row.try_get("product_count")?)?,
                    available_product_count: non_negative(
                        "category",
                        row.try_get("available_product_count")?,
                    )?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        let images = serde_json::to_value(&product.images)?;
        sqlx::query(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        ))
        .bind(product.id.as_uuid())
        .bind(product.seller_id.as_uuid())
        .bind(product.category_id.as_uuid())
        .bind(&product.breed)
        .bind(product.age_weeks as i32)
        .bind(product.weight_kg)
        .bind(product.price.units())
        .bind(&product.description)
        .bind(images)
        .bind(product.is_available)
        .bind(i64::from(product.stock))
        .bind(product.version)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .map(Self::row_to_product)
        .transpose()
    }

    async fn update_product(&self, product: &Product, expected_version: i64) -> Result<bool> {
        let images = serde_json::to_value(&product.images)?;
        let result = sqlx::query(
            r#"
            UPDATE products SET
                category_id = $3, breed = $4, age_weeks = $5, weight_kg = $6, price = $7,
                description = $8, images = $9, is_available = $10, stock = $11,
                version = $12, updated_at = $13
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(expected_version)
        .bind(product.category_id.as_uuid())
        .bind(&product.breed)
        .bind(product.age_weeks as i32)
        .bind(product.weight_kg)
        .bind(product.price.units())
        .bind(&product.description)
        .bind(images)
        .bind(product.is_available)
        .bind(i64::from(product.stock))
        .bind(product.version)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        // Nothing matched: either the row is gone or its version moved on.
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(product.id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        if exists {
            Err(StoreError::ConcurrencyConflict {
                entity: "product",
                id: product.id.to_string(),
            })
        } else {
            Ok(false)
        }
    }

    async fn delete_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        sqlx::query(&format!(
            "DELETE FROM products WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .map(Self::row_to_product)
        .transpose()
    }

    async fn query_products(&self, query: &ProductQuery) -> Result<ProductPage> {
        let mut totals_sql =
            String::from("SELECT COUNT(*) AS total, COALESCE(SUM(stock), 0)::BIGINT AS stock_sum FROM products");
        push_product_filters(&mut totals_sql, query);
        let totals = bind_product_filters(sqlx::query(&totals_sql), query)
            .fetch_one(&self.pool)
            .await?;

        let mut sql = format!("SELECT {PRODUCT_COLUMNS} FROM products");
        let param_count = push_product_filters(&mut sql, query);
        sql.push_str(&format!(
            " ORDER BY created_at DESC, id ASC LIMIT ${} OFFSET ${}",
            param_count + 1,
            param_count + 2
        ));
        let rows = bind_product_filters(sqlx::query(&sql), query)
            .bind(i64::from(query.limit))
            .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        Ok(ProductPage {
            products: rows
                .into_iter()
                .map(Self::row_to_product)
                .collect::<Result<_>>()?,
            page: query.page,
            limit: query.limit,
            total: non_negative("product", totals.try_get("total")?)?,
            stock_sum: non_negative("product", totals.try_get("stock_sum")?)?,
        })
    }

    async fn products_by_seller(&self, seller_id: SellerId) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE seller_id = $1 ORDER BY created_at DESC"
        ))
        .bind(seller_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn decrement_stock_if_available(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - $2, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND is_available AND stock >= $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(i64::from(quantity))
        .execute(&self.pool)
        .await
        .map_err(|e| map_stock_overflow(e, product_id))?;
        Ok(result.rows_affected() == 1)
    }

    async fn restock(&self, product_id: ProductId, quantity: u32) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + $2, version = version + 1, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(i64::from(quantity))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let items = serde_json::to_value(order.items())?;
        let address = serde_json::to_value(order.delivery_address())?;
        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        ))
        .bind(order.id().as_uuid())
        .bind(order.order_number().as_str())
        .bind(order.buyer_id().as_uuid())
        .bind(order.seller_id().map(|id| id.as_uuid()))
        .bind(items)
        .bind(order.total_amount().units())
        .bind(order.status().as_str())
        .bind(order.payment_method().as_str())
        .bind(order.payment_status().as_str())
        .bind(address)
        .bind(order.notes())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_order)
            .transpose()
    }

    async fn update_order_status(&self, order: &Order, expected: OrderStatus) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET status = $3, payment_status = $4, notes = $5, updated_at = $6
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(expected.as_str())
        .bind(order.status().as_str())
        .bind(order.payment_status().as_str())
        .bind(order.notes())
        .bind(order.updated_at())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn orders_for_buyer(&self, buyer_id: BuyerId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE buyer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(buyer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn orders_for_seller(&self, seller_id: SellerId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE seller_id = $1 ORDER BY created_at DESC"
        ))
        .bind(seller_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }
}
