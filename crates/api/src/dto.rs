//! Wire types: camelCase request bodies and response payloads.

use catalog::{CategorySummary, Profile, ProductDetails};
use chrono::{DateTime, Utc};
use common::{BuyerId, CategoryId, OrderId, ProductId, SellerId, UserId};
use domain::{
    Address, BuyerProfile, BuyerSummary, Category, CategoryStats, LineItem, Money, NewProduct,
    Product, ProductPatch, SellerProfile, SellerSummary,
};
use orders::{CartItem, OrderView, PlaceOrderRequest};
use serde::{Deserialize, Serialize};
use store::{ProductPage, ProductQuery};

/// Success envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

// -- Shared --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressDto {
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
}

impl From<AddressDto> for Address {
    fn from(dto: AddressDto) -> Self {
        Address {
            address_line1: dto.address_line1,
            address_line2: dto.address_line2,
            city: dto.city,
            postal_code: dto.postal_code,
            contact_phone: dto.contact_phone,
        }
    }
}

impl From<&Address> for AddressDto {
    fn from(address: &Address) -> Self {
        AddressDto {
            address_line1: address.address_line1.clone(),
            address_line2: address.address_line2.clone(),
            city: address.city.clone(),
            postal_code: address.postal_code.clone(),
            contact_phone: address.contact_phone.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerSummaryDto {
    pub id: SellerId,
    pub farm_name: String,
    pub city: String,
}

impl From<SellerSummary> for SellerSummaryDto {
    fn from(summary: SellerSummary) -> Self {
        Self {
            id: summary.seller_id,
            farm_name: summary.farm_name,
            city: summary.city,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerSummaryDto {
    pub id: BuyerId,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub city: String,
}

impl From<BuyerSummary> for BuyerSummaryDto {
    fn from(summary: BuyerSummary) -> Self {
        Self {
            id: summary.buyer_id,
            kind: summary.kind.as_str(),
            city: summary.city,
        }
    }
}

// -- Orders --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineBody {
    pub lapin_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderBody {
    #[serde(default)]
    pub items: Vec<CartLineBody>,
    #[serde(default)]
    pub delivery_address: Option<AddressDto>,
}

impl From<PlaceOrderBody> for PlaceOrderRequest {
    fn from(body: PlaceOrderBody) -> Self {
        PlaceOrderRequest {
            items: body
                .items
                .into_iter()
                .map(|line| CartItem {
                    product_id: line.lapin_id,
                    quantity: line.quantity,
                })
                .collect(),
            delivery_address: body.delivery_address.map(Address::from),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelBody {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusBody {
    pub payment_status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemDto {
    pub lapin_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub lapin_breed: String,
}

impl From<&LineItem> for LineItemDto {
    fn from(item: &LineItem) -> Self {
        Self {
            lapin_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            lapin_breed: item.breed.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    pub id: OrderId,
    pub order_number: String,
    pub client_id: BuyerId,
    pub items: Vec<LineItemDto>,
    pub total_amount: Money,
    pub status: &'static str,
    pub payment_method: &'static str,
    pub payment_status: &'static str,
    pub delivery_address: AddressDto,
    pub assigned_eleveur_id: Option<SellerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eleveur: Option<SellerSummaryDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<BuyerSummaryDto>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderView> for OrderDto {
    fn from(view: OrderView) -> Self {
        let order = view.order;
        Self {
            id: order.id(),
            order_number: order.order_number().to_string(),
            client_id: order.buyer_id(),
            items: order.items().iter().map(LineItemDto::from).collect(),
            total_amount: order.total_amount(),
            status: order.status().as_str(),
            payment_method: order.payment_method().as_str(),
            payment_status: order.payment_status().as_str(),
            delivery_address: AddressDto::from(order.delivery_address()),
            assigned_eleveur_id: order.seller_id(),
            eleveur: view.seller.map(SellerSummaryDto::from),
            client: view.buyer.map(BuyerSummaryDto::from),
            notes: order.notes().map(str::to_string),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }
}

// -- Products --

fn default_stock() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductBody {
    pub category_id: CategoryId,
    pub breed: String,
    pub age: u32,
    pub weight: f64,
    pub price: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "default_stock")]
    pub stock: i64,
    #[serde(default)]
    pub is_available: Option<bool>,
}

impl From<CreateProductBody> for NewProduct {
    fn from(body: CreateProductBody) -> Self {
        NewProduct {
            category_id: body.category_id,
            breed: body.breed,
            age_weeks: body.age,
            weight_kg: body.weight,
            price: Money::from_units(body.price),
            description: body.description,
            images: body.images,
            stock: body.stock,
            is_available: body.is_available,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductBody {
    pub category_id: Option<CategoryId>,
    pub breed: Option<String>,
    pub age: Option<u32>,
    pub weight: Option<f64>,
    pub price: Option<i64>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    pub stock: Option<i64>,
    pub is_available: Option<bool>,
}

impl From<UpdateProductBody> for ProductPatch {
    fn from(body: UpdateProductBody) -> Self {
        ProductPatch {
            category_id: body.category_id,
            breed: body.breed,
            age_weeks: body.age,
            weight_kg: body.weight,
            price: body.price.map(Money::from_units),
            description: body.description,
            images: body.images,
            is_available: body.is_available,
            stock: body.stock,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummaryDto {
    pub id: CategoryId,
    pub name: String,
}

impl From<CategorySummary> for CategorySummaryDto {
    fn from(summary: CategorySummary) -> Self {
        Self {
            id: summary.category_id,
            name: summary.name,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: ProductId,
    pub eleveur_id: SellerId,
    pub category_id: CategoryId,
    pub breed: String,
    pub age: u32,
    pub weight: f64,
    pub price: Money,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub is_available: bool,
    pub stock: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eleveur: Option<SellerSummaryDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategorySummaryDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductDto {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            eleveur_id: product.seller_id,
            category_id: product.category_id,
            breed: product.breed,
            age: product.age_weeks,
            weight: product.weight_kg,
            price: product.price,
            description: product.description,
            images: product.images,
            is_available: product.is_available,
            stock: product.stock,
            eleveur: None,
            category: None,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

impl From<ProductDetails> for ProductDto {
    fn from(details: ProductDetails) -> Self {
        Self {
            eleveur: details.seller.map(SellerSummaryDto::from),
            category: details.category.map(CategorySummaryDto::from),
            ..Self::from(details.product)
        }
    }
}

/// Raw listing query string. Values are parsed leniently: anything
/// unparseable is ignored in favour of the default.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub category_id: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListParams {
    pub fn to_query(&self) -> ProductQuery {
        let mut query = ProductQuery::new();
        if let Some(category_id) = self
            .category_id
            .as_deref()
            .and_then(|raw| CategoryId::parse(raw.trim()).ok())
        {
            query = query.category(category_id);
        }
        if let Some(min) = lenient::<i64>(&self.min_price) {
            query = query.min_price(Money::from_units(min));
        }
        if let Some(max) = lenient::<i64>(&self.max_price) {
            query = query.max_price(Money::from_units(max));
        }
        if let Some(page) = lenient::<u32>(&self.page) {
            query = query.page(page);
        }
        if let Some(limit) = lenient::<u32>(&self.limit) {
            query = query.limit(limit);
        }
        query
    }
}

fn lenient<T: std::str::FromStr>(raw: &Option<String>) -> Option<T> {
    raw.as_deref().and_then(|v| v.trim().parse().ok())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingStats {
    /// Number of listed products (breeds) matching the filters.
    pub total_race_lapins: u64,
    /// Units in stock across those products.
    pub total_lapins: u64,
}

/// A page of products with its listing totals.
#[derive(Debug, Serialize)]
pub struct ProductListResponse<T> {
    pub success: bool,
    pub data: T,
    pub stats: ListingStats,
    pub pagination: Pagination,
}

impl<T> ProductListResponse<T> {
    pub fn new(page: &ProductPage, data: T) -> Self {
        Self {
            success: true,
            data,
            stats: ListingStats {
                total_race_lapins: page.total,
                total_lapins: page.stock_sum,
            },
            pagination: Pagination {
                page: page.page,
                limit: page.limit,
                total: page.total,
                pages: page.pages(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryListing {
    pub category: CategoryDto,
    pub lapins: Vec<ProductDto>,
}

// -- Categories --

#[derive(Debug, Deserialize)]
pub struct CreateCategoryBody {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub stock_total: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Category> for CategoryDto {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            is_active: category.is_active,
            stock_total: category.stock_total,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStatsDto {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub stock_total: u64,
    pub product_count: u64,
    pub available_product_count: u64,
}

impl From<CategoryStats> for CategoryStatsDto {
    fn from(stats: CategoryStats) -> Self {
        Self {
            id: stats.category_id,
            name: stats.name,
            description: stats.description,
            stock_total: stats.stock_total,
            product_count: stats.product_count,
            available_product_count: stats.available_product_count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeDto {
    pub category_id: CategoryId,
    pub stock_total: u64,
}

// -- Profiles --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerProfileBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub delivery_address: AddressDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerProfileBody {
    pub farm_name: String,
    pub city: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApprovalBody {
    pub approved: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerProfileDto {
    pub id: BuyerId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub delivery_address: AddressDto,
    pub created_at: DateTime<Utc>,
}

impl From<BuyerProfile> for BuyerProfileDto {
    fn from(profile: BuyerProfile) -> Self {
        Self {
            id: profile.id,
            user_id: profile.user_id,
            kind: profile.kind.as_str(),
            delivery_address: AddressDto::from(&profile.delivery_address),
            created_at: profile.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerProfileDto {
    pub id: SellerId,
    pub user_id: UserId,
    pub farm_name: String,
    pub city: String,
    pub description: Option<String>,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

impl From<SellerProfile> for SellerProfileDto {
    fn from(profile: SellerProfile) -> Self {
        Self {
            id: profile.id,
            user_id: profile.user_id,
            farm_name: profile.farm_name,
            city: profile.farm_city,
            description: profile.description,
            is_approved: profile.is_approved,
            created_at: profile.created_at,
        }
    }
}

/// The caller's profile, tagged with its kind.
#[derive(Debug, Serialize)]
#[serde(tag = "profileType", rename_all = "lowercase")]
pub enum ProfileDto {
    Buyer(BuyerProfileDto),
    Seller(SellerProfileDto),
}

impl From<Profile> for ProfileDto {
    fn from(profile: Profile) -> Self {
        match profile {
            Profile::Buyer(p) => ProfileDto::Buyer(p.into()),
            Profile::Seller(p) => ProfileDto::Seller(p.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_ignore_garbage() {
        let params = ListParams {
            category_id: Some("not-a-uuid".into()),
            min_price: Some("abc".into()),
            max_price: Some("20000".into()),
            page: Some("3".into()),
            limit: Some("500".into()),
        };
        let query = params.to_query();
        assert!(query.category_id.is_none());
        assert!(query.min_price.is_none());
        assert_eq!(query.max_price, Some(Money::from_units(20000)));
        assert_eq!(query.page, 3);
        assert_eq!(query.limit, 100);
    }

    #[test]
    fn cart_body_uses_lapin_id() {
        let id = ProductId::new();
        let body: PlaceOrderBody = serde_json::from_value(serde_json::json!({
            "items": [{ "lapinId": id.to_string(), "quantity": 2 }],
            "deliveryAddress": { "addressLine1": "Rue 12", "city": "Abidjan" }
        }))
        .unwrap();
        let request = PlaceOrderRequest::from(body);
        assert_eq!(request.items[0].product_id, id);
        assert_eq!(request.items[0].quantity, 2);
        assert_eq!(request.delivery_address.unwrap().city, "Abidjan");
    }
}
