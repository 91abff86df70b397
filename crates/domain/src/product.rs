//! Catalog products ("lapins") and their validation rules.

use chrono::{DateTime, Utc};
use common::{CategoryId, ProductId, SellerId};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::value_objects::Money;

const BREED_MIN_CHARS: usize = 2;
const BREED_MAX_CHARS: usize = 100;
const AGE_MIN_WEEKS: u32 = 1;
const AGE_MAX_WEEKS: u32 = 200;
const WEIGHT_MIN_KG: f64 = 0.1;
const WEIGHT_MAX_KG: f64 = 50.0;
const DESCRIPTION_MAX_CHARS: usize = 1000;

/// A sellable catalog entry.
///
/// `is_available` and `stock` are independent: a product can be withdrawn
/// from sale while units remain, and public listings filter on both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub seller_id: SellerId,
    pub category_id: CategoryId,
    pub breed: String,
    pub age_weeks: u32,
    pub weight_kg: f64,
    pub price: Money,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub is_available: bool,
    pub stock: u32,
    /// Bumped by every write, including stock movements; used to detect
    /// concurrent updates.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by a seller when listing a new product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub category_id: CategoryId,
    pub breed: String,
    pub age_weeks: u32,
    pub weight_kg: f64,
    pub price: Money,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub stock: i64,
    #[serde(default)]
    pub is_available: Option<bool>,
}

/// Partial update of a product; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub category_id: Option<CategoryId>,
    pub breed: Option<String>,
    pub age_weeks: Option<u32>,
    pub weight_kg: Option<f64>,
    pub price: Option<Money>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    pub is_available: Option<bool>,
    pub stock: Option<i64>,
}

impl Product {
    /// Builds a product owned by `seller_id` from validated seller input.
    pub fn create(seller_id: SellerId, input: NewProduct) -> Result<Self, ValidationError> {
        let breed = validate_breed(&input.breed)?;
        validate_age(input.age_weeks)?;
        validate_weight(input.weight_kg)?;
        validate_price(input.price)?;
        let stock = validate_stock(input.stock)?;
        validate_description(input.description.as_deref())?;

        let now = Utc::now();
        Ok(Self {
            id: ProductId::new(),
            seller_id,
            category_id: input.category_id,
            breed,
            age_weeks: input.age_weeks,
            weight_kg: input.weight_kg,
            price: input.price,
            description: input.description,
            images: normalize_images(input.images),
            is_available: input.is_available.unwrap_or(true),
            stock,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns a copy with `patch` applied, or the first violated rule.
    pub fn patched(&self, patch: ProductPatch) -> Result<Self, ValidationError> {
        let mut updated = self.clone();
        if let Some(category_id) = patch.category_id {
            updated.category_id = category_id;
        }
        if let Some(breed) = patch.breed {
            updated.breed = validate_breed(&breed)?;
        }
        if let Some(age) = patch.age_weeks {
            validate_age(age)?;
            updated.age_weeks = age;
        }
        if let Some(weight) = patch.weight_kg {
            validate_weight(weight)?;
            updated.weight_kg = weight;
        }
        if let Some(price) = patch.price {
            validate_price(price)?;
            updated.price = price;
        }
        if let Some(description) = patch.description {
            validate_description(Some(&description))?;
            updated.description = Some(description);
        }
        if let Some(images) = patch.images {
            updated.images = normalize_images(images);
        }
        if let Some(is_available) = patch.is_available {
            updated.is_available = is_available;
        }
        if let Some(stock) = patch.stock {
            updated.stock = validate_stock(stock)?;
        }
        updated.version = self.version + 1;
        updated.updated_at = Utc::now();
        Ok(updated)
    }

    /// Returns true if `quantity` units can currently be sold.
    pub fn can_fulfill(&self, quantity: u32) -> bool {
        self.can_fulfill_total(u64::from(quantity))
    }

    /// Like `can_fulfill`, for the summed demand of several order lines.
    pub fn can_fulfill_total(&self, quantity: u64) -> bool {
        self.is_available && u64::from(self.stock) >= quantity
    }

    /// Returns true if the product appears in public listings.
    pub fn is_listed(&self) -> bool {
        self.is_available && self.stock > 0
    }
}

impl ProductPatch {
    /// Returns true if the patch can change the category's stock total.
    pub fn touches_stock(&self) -> bool {
        self.stock.is_some() || self.is_available.is_some() || self.category_id.is_some()
    }
}

fn validate_breed(breed: &str) -> Result<String, ValidationError> {
    let len = breed.trim().chars().count();
    if !(BREED_MIN_CHARS..=BREED_MAX_CHARS).contains(&len) {
        return Err(ValidationError::field(
            "breed",
            format!("must be between {BREED_MIN_CHARS} and {BREED_MAX_CHARS} characters"),
        ));
    }
    Ok(breed.to_string())
}

fn validate_age(age_weeks: u32) -> Result<(), ValidationError> {
    if !(AGE_MIN_WEEKS..=AGE_MAX_WEEKS).contains(&age_weeks) {
        return Err(ValidationError::field(
            "age",
            format!("must be between {AGE_MIN_WEEKS} and {AGE_MAX_WEEKS} weeks"),
        ));
    }
    Ok(())
}

fn validate_weight(weight_kg: f64) -> Result<(), ValidationError> {
    if !weight_kg.is_finite() || !(WEIGHT_MIN_KG..=WEIGHT_MAX_KG).contains(&weight_kg) {
        return Err(ValidationError::field(
            "weight",
            format!("must be between {WEIGHT_MIN_KG} and {WEIGHT_MAX_KG} kg"),
        ));
    }
    Ok(())
}

fn validate_price(price: Money) -> Result<(), ValidationError> {
    if price.is_negative() {
        return Err(ValidationError::field("price", "cannot be negative"));
    }
    Ok(())
}

fn validate_stock(stock: i64) -> Result<u32, ValidationError> {
    if stock < 0 {
        return Err(ValidationError::field("stock", "cannot be negative"));
    }
    u32::try_from(stock).map_err(|_| ValidationError::field("stock", "is too large"))
}

fn validate_description(description: Option<&str>) -> Result<(), ValidationError> {
    if let Some(desc) = description
        && desc.chars().count() > DESCRIPTION_MAX_CHARS
    {
        return Err(ValidationError::field(
            "description",
            format!("must be at most {DESCRIPTION_MAX_CHARS} characters"),
        ));
    }
    Ok(())
}

fn normalize_images(images: Vec<String>) -> Vec<String> {
    images
        .into_iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect()
}
