//! Identities, roles, and the buyer/seller profiles attached to them.

use chrono::{DateTime, Utc};
use common::{BuyerId, SellerId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::value_objects::Address;

/// Role carried by an authenticated identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Buyer placing orders.
    Client,
    /// Seller listing products.
    Eleveur,
    /// Back-office operator.
    Gestionnaire,
    /// Platform administrator.
    Admin,
}

impl Role {
    /// Returns true for back-office roles that may act on any seller's data.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Gestionnaire | Role::Admin)
    }

    /// Returns the wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Eleveur => "eleveur",
            Role::Gestionnaire => "gestionnaire",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "eleveur" => Ok(Role::Eleveur),
            "gestionnaire" => Ok(Role::Gestionnaire),
            "admin" => Ok(Role::Admin),
            other => Err(ValidationError::field(
                "role",
                format!("'{other}' is not a known role"),
            )),
        }
    }
}

/// The caller of an operation, as established by the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Returns true if the identity holds `role`.
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

/// Kind of buyer account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuyerKind {
    Particulier,
    Professionnel,
}

impl BuyerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuyerKind::Particulier => "particulier",
            BuyerKind::Professionnel => "professionnel",
        }
    }
}

impl std::str::FromStr for BuyerKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "particulier" => Ok(BuyerKind::Particulier),
            "professionnel" => Ok(BuyerKind::Professionnel),
            other => Err(ValidationError::field(
                "type",
                format!("'{other}' must be particulier or professionnel"),
            )),
        }
    }
}

/// Buyer profile owned by a `client` identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyerProfile {
    pub id: BuyerId,
    pub user_id: UserId,
    pub kind: BuyerKind,
    /// Default delivery address, used when an order does not supply one.
    pub delivery_address: Address,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BuyerProfile {
    /// Creates a new buyer profile after validating the default address.
    pub fn register(
        user_id: UserId,
        kind: BuyerKind,
        delivery_address: Address,
    ) -> Result<Self, ValidationError> {
        delivery_address.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: BuyerId::new(),
            user_id,
            kind,
            delivery_address,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn summary(&self) -> BuyerSummary {
        BuyerSummary {
            buyer_id: self.id,
            kind: self.kind,
            city: self.delivery_address.city.clone(),
        }
    }
}

/// Seller profile owned by an `eleveur` identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerProfile {
    pub id: SellerId,
    pub user_id: UserId,
    pub farm_name: String,
    pub farm_city: String,
    pub description: Option<String>,
    /// Only approved sellers may list products.
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SellerProfile {
    /// Creates a new, not yet approved, seller profile.
    pub fn register(
        user_id: UserId,
        farm_name: impl Into<String>,
        farm_city: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self, ValidationError> {
        let farm_name = farm_name.into().trim().to_string();
        let farm_city = farm_city.into();
        if farm_name.is_empty() {
            return Err(ValidationError::field("farmName", "is required"));
        }
        if farm_city.trim().is_empty() {
            return Err(ValidationError::field("city", "is required"));
        }
        if let Some(desc) = &description
            && desc.chars().count() > 500
        {
            return Err(ValidationError::field(
                "description",
                "must be at most 500 characters",
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: SellerId::new(),
            user_id,
            farm_name,
            farm_city,
            description,
            is_approved: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn summary(&self) -> SellerSummary {
        SellerSummary {
            seller_id: self.id,
            farm_name: self.farm_name.clone(),
            city: self.farm_city.clone(),
        }
    }
}

/// Seller fields shown next to orders and products, resolved at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerSummary {
    pub seller_id: SellerId,
    pub farm_name: String,
    pub city: String,
}

/// Buyer fields shown to sellers next to their orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerSummary {
    pub buyer_id: BuyerId,
    pub kind: BuyerKind,
    pub city: String,
}
