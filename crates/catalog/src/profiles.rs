//! Buyer and seller profile registration and seller approval.

use common::SellerId;
use domain::{Address, BuyerKind, BuyerProfile, Identity, Role, SellerProfile};
use store::{ProfileStore, StoreError, error::constraints};

use crate::{CatalogError, Result};

/// The profile attached to an identity.
#[derive(Debug, Clone, PartialEq)]
pub enum Profile {
    Buyer(BuyerProfile),
    Seller(SellerProfile),
}

/// Profile operations. Each user owns at most one profile of its role's kind.
#[derive(Clone)]
pub struct ProfileService<S> {
    store: S,
}

impl<S: ProfileStore> ProfileService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Registers the calling client's buyer profile.
    #[tracing::instrument(skip(self, delivery_address), fields(user_id = %identity.user_id))]
    pub async fn register_buyer(
        &self,
        identity: &Identity,
        kind: BuyerKind,
        delivery_address: Address,
    ) -> Result<BuyerProfile> {
        if !identity.has_role(Role::Client) {
            return Err(CatalogError::forbidden(
                "Only clients can register a buyer profile",
            ));
        }
        let profile = BuyerProfile::register(identity.user_id, kind, delivery_address)?;
        self.store
            .insert_buyer(&profile)
            .await
            .map_err(|e| already_exists(e, constraints::BUYER_USER, "Buyer profile"))?;
        tracing::info!(buyer_id = %profile.id, "buyer profile registered");
        Ok(profile)
    }

    /// Registers the calling seller's profile, pending approval.
    #[tracing::instrument(skip(self, description), fields(user_id = %identity.user_id))]
    pub async fn register_seller(
        &self,
        identity: &Identity,
        farm_name: &str,
        farm_city: &str,
        description: Option<String>,
    ) -> Result<SellerProfile> {
        if !identity.has_role(Role::Eleveur) {
            return Err(CatalogError::forbidden(
                "Only sellers can register a seller profile",
            ));
        }
        let profile = SellerProfile::register(identity.user_id, farm_name, farm_city, description)?;
        self.store
            .insert_seller(&profile)
            .await
            .map_err(|e| already_exists(e, constraints::SELLER_USER, "Seller profile"))?;
        tracing::info!(seller_id = %profile.id, "seller profile registered");
        Ok(profile)
    }

    /// Returns the caller's own profile.
    pub async fn my_profile(&self, identity: &Identity) -> Result<Profile> {
        let profile = match identity.role {
            Role::Client => self
                .store
                .find_buyer_by_user(identity.user_id)
                .await?
                .map(Profile::Buyer),
            Role::Eleveur => self
                .store
                .find_seller_by_user(identity.user_id)
                .await?
                .map(Profile::Seller),
            Role::Gestionnaire | Role::Admin => None,
        };
        profile.ok_or_else(|| CatalogError::not_found("Profile", identity.user_id))
    }

    /// Approves or revokes a seller. Back-office roles only.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn set_seller_approval(
        &self,
        identity: &Identity,
        seller_id: SellerId,
        approved: bool,
    ) -> Result<SellerProfile> {
        if !identity.role.is_elevated() {
            return Err(CatalogError::forbidden(
                "Only managers and administrators can approve sellers",
            ));
        }
        let seller = self
            .store
            .set_seller_approval(seller_id, approved)
            .await?
            .ok_or_else(|| CatalogError::not_found("SellerProfile", seller_id))?;
        tracing::info!(%seller_id, approved, "seller approval changed");
        Ok(seller)
    }
}

fn already_exists(e: StoreError, constraint: &str, what: &str) -> CatalogError {
    if e.is_unique_violation_of(constraint) {
        CatalogError::AlreadyExists(format!("{what} already exists for this user"))
    } else {
        e.into()
    }
}
