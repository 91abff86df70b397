//! Request extractors: caller identity, JSON bodies, and path identifiers.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, OptionalFromRequest, Request};
use axum::http::request::Parts;
use domain::{Identity, Role, UserId};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Header carrying the authenticated user's id, set by the gateway.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the authenticated user's role, set by the gateway.
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated caller.
///
/// Token verification happens upstream; this only reads the identity the
/// gateway forwarded. A missing or malformed identity is rejected with 401.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Identity);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, USER_ID_HEADER)?;
        let role = header(parts, USER_ROLE_HEADER)?;

        let user_id = UserId::parse(user_id).map_err(|_| {
            tracing::warn!(uri = %parts.uri, "malformed user id header");
            ApiError::Unauthorized("Invalid user identity".to_string())
        })?;
        let role = role.parse::<Role>().map_err(|_| {
            tracing::warn!(uri = %parts.uri, "unknown role header");
            ApiError::Unauthorized("Invalid user role".to_string())
        })?;

        Ok(Caller(Identity::new(user_id, role)))
    }
}

/// A caller holding the `client` role.
///
/// Parts extractors run before the body is read, so other roles are refused
/// with 403 whatever they send.
#[derive(Debug, Clone, Copy)]
pub struct ClientCaller(pub Identity);

impl<S> FromRequestParts<S> for ClientCaller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Caller(identity) = Caller::from_request_parts(parts, state).await?;
        if !identity.has_role(Role::Client) {
            return Err(ApiError::Forbidden(
                "Only clients can place orders".to_string(),
            ));
        }
        Ok(ClientCaller(identity))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
}

/// `Json<T>` whose rejections use the API error envelope.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        let axum::Json(value) = <axum::Json<T> as FromRequest<S>>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(ApiJson(value))
    }
}

/// An empty or whitespace-only body is `None`; anything else must be valid JSON.
impl<T, S> OptionalFromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, ApiError> {
        let bytes = <Bytes as FromRequest<S>>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let axum::Json(value) = axum::Json::<T>::from_bytes(&bytes)
            .map_err(|rejection: JsonRejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(Some(ApiJson(value)))
    }
}

/// Parses a path segment into a typed identifier, 400 when malformed.
pub fn parse_id<T>(raw: &str, parse: fn(&str) -> Result<T, uuid::Error>) -> Result<T, ApiError> {
    parse(raw).map_err(|_| ApiError::BadRequest(format!("Invalid ID format: {raw}")))
}
