//! Buyer and seller profile endpoints (`/api/profiles`).

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::SellerId;
use domain::BuyerKind;
use store::Store;

use crate::dto::{
    ApprovalBody, BuyerProfileBody, BuyerProfileDto, Envelope, ProfileDto, SellerProfileBody,
    SellerProfileDto,
};
use crate::error::ApiError;
use crate::extract::{ApiJson, Caller, parse_id};
use crate::state::AppState;

/// POST /api/profiles/buyer
pub async fn register_buyer<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    ApiJson(body): ApiJson<BuyerProfileBody>,
) -> Result<(StatusCode, Json<Envelope<BuyerProfileDto>>), ApiError> {
    let kind = body
        .kind
        .parse::<BuyerKind>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let profile = state
        .profiles
        .register_buyer(&identity, kind, body.delivery_address.into())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message("Buyer profile created", profile.into())),
    ))
}

/// POST /api/profiles/seller
pub async fn register_seller<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    ApiJson(body): ApiJson<SellerProfileBody>,
) -> Result<(StatusCode, Json<Envelope<SellerProfileDto>>), ApiError> {
    let profile = state
        .profiles
        .register_seller(&identity, &body.farm_name, &body.city, body.description)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "Seller profile created, pending approval",
            profile.into(),
        )),
    ))
}

/// GET /api/profiles/me
pub async fn me<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
) -> Result<Json<Envelope<ProfileDto>>, ApiError> {
    let profile = state.profiles.my_profile(&identity).await?;
    Ok(Json(Envelope::data(profile.into())))
}

/// POST /api/profiles/sellers/{id}/approve
pub async fn approve_seller<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ApprovalBody>,
) -> Result<Json<Envelope<SellerProfileDto>>, ApiError> {
    let seller_id = parse_id(&id, SellerId::parse)?;
    let profile = state
        .profiles
        .set_seller_approval(&identity, seller_id, body.approved)
        .await?;
    let message = if body.approved {
        "Seller approved"
    } else {
        "Seller approval revoked"
    };
    Ok(Json(Envelope::with_message(message, profile.into())))
}
