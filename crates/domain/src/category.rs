//! Product categories and their derived stock aggregate.

use chrono::{DateTime, Utc};
use common::CategoryId;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const DESCRIPTION_MAX_CHARS: usize = 500;

/// A product category.
///
/// `stock_total` is derived: the sum of `stock` over the available products
/// of this category. It is only ever written by the stock recomputer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub stock_total: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Creates an active, empty category.
    pub fn create(
        name: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::field("name", "is required"));
        }
        if let Some(desc) = &description
            && desc.chars().count() > DESCRIPTION_MAX_CHARS
        {
            return Err(ValidationError::field(
                "description",
                format!("must be at most {DESCRIPTION_MAX_CHARS} characters"),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: CategoryId::new(),
            name,
            description,
            is_active: true,
            stock_total: 0,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Per-category counters for the statistics listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category_id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub stock_total: u64,
    pub product_count: u64,
    pub available_product_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_trims_name() {
        let category = Category::create("  Viande ", None).unwrap();
        assert_eq!(category.name, "Viande");
        assert!(category.is_active);
        assert_eq!(category.stock_total, 0);
    }

    #[test]
    fn test_create_rejects_blank_name() {
        assert!(Category::create("   ", None).is_err());
    }

    #[test]
    fn test_create_rejects_long_description() {
        let desc = "a".repeat(501);
        assert!(Category::create("Reproducteur", Some(desc)).is_err());
    }
}
