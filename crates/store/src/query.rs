use common::{CategoryId, SellerId};
use domain::{Money, Product};

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;

/// Builder for public product listing queries.
///
/// Listings only ever return products that are available with stock left;
/// the optional filters narrow that set further. Results are newest first.
#[derive(Debug, Clone)]
pub struct ProductQuery {
    /// Filter by category.
    pub category_id: Option<CategoryId>,

    /// Filter by seller.
    pub seller_id: Option<SellerId>,

    /// Minimum price (inclusive).
    pub min_price: Option<Money>,

    /// Maximum price (inclusive).
    pub max_price: Option<Money>,

    /// 1-based page number.
    pub page: u32,

    /// Page size.
    pub limit: u32,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            category_id: None,
            seller_id: None,
            min_price: None,
            max_price: None,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ProductQuery {
    /// Creates a query for the first page of all listed products.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by category.
    pub fn category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Filters by seller.
    pub fn seller(mut self, seller_id: SellerId) -> Self {
        self.seller_id = Some(seller_id);
        self
    }

    /// Filters to prices at or above `price`.
    pub fn min_price(mut self, price: Money) -> Self {
        self.min_price = Some(price);
        self
    }

    /// Filters to prices at or below `price`.
    pub fn max_price(mut self, price: Money) -> Self {
        self.max_price = Some(price);
        self
    }

    /// Selects a page; zero is treated as the first page.
    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Sets the page size, clamped to `1..=100`.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit.clamp(1, MAX_LIMIT);
        self
    }

    /// Number of rows to skip for the selected page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// Returns true if `product` passes every filter of this query.
    pub fn matches(&self, product: &Product) -> bool {
        if !product.is_listed() {
            return false;
        }
        if let Some(category_id) = self.category_id
            && product.category_id != category_id
        {
            return false;
        }
        if let Some(seller_id) = self.seller_id
            && product.seller_id != seller_id
        {
            return false;
        }
        if let Some(min) = self.min_price
            && product.price < min
        {
            return false;
        }
        if let Some(max) = self.max_price
            && product.price > max
        {
            return false;
        }
        true
    }
}

/// One page of a product listing plus totals over the whole filtered set.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page: u32,
    pub limit: u32,
    /// Number of products matching the filters, across all pages.
    pub total: u64,
    /// Sum of stock of the products matching the filters.
    pub stock_sum: u64,
}

impl ProductPage {
    /// Number of pages needed for `total` at this page size.
    pub fn pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.limit.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_and_limit_are_clamped() {
        let query = ProductQuery::new().page(0).limit(1000);
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 100);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn offset_follows_page() {
        let query = ProductQuery::new().page(3).limit(10);
        assert_eq!(query.offset(), 20);
    }

    #[test]
    fn pages_rounds_up() {
        let page = ProductPage {
            products: vec![],
            page: 1,
            limit: 10,
            total: 21,
            stock_sum: 0,
        };
        assert_eq!(page.pages(), 3);
    }
}
