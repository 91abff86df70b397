//! Order placement and lifecycle endpoints (`/api/commandes`).

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::{OrderStatus, PaymentStatus};
use store::Store;

use crate::dto::{
    CancelBody, Envelope, OrderDto, PaymentStatusBody, PlaceOrderBody, UpdateStatusBody,
};
use crate::error::ApiError;
use crate::extract::{ApiJson, Caller, ClientCaller, parse_id};
use crate::state::AppState;

type OrderResponse = Result<Json<Envelope<OrderDto>>, ApiError>;

/// POST /api/commandes: place an order from a cart.
pub async fn place<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    ClientCaller(identity): ClientCaller,
    ApiJson(body): ApiJson<PlaceOrderBody>,
) -> Result<(StatusCode, Json<Envelope<OrderDto>>), ApiError> {
    let view = state.orders.place_order(&identity, body.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "Order created successfully",
            OrderDto::from(view),
        )),
    ))
}

/// GET /api/commandes/mes-commandes: the calling buyer's orders.
pub async fn mine<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
) -> Result<Json<Envelope<Vec<OrderDto>>>, ApiError> {
    let views = state.orders.list_for_buyer(&identity).await?;
    Ok(Json(Envelope::data(
        views.into_iter().map(OrderDto::from).collect(),
    )))
}

/// GET /api/commandes/eleveur/mes-commandes: orders assigned to the calling seller.
pub async fn assigned<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
) -> Result<Json<Envelope<Vec<OrderDto>>>, ApiError> {
    let views = state.orders.list_for_seller(&identity).await?;
    Ok(Json(Envelope::data(
        views.into_iter().map(OrderDto::from).collect(),
    )))
}

/// GET /api/commandes/{id}
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
) -> OrderResponse {
    let order_id = parse_id(&id, OrderId::parse)?;
    let view = state.orders.get_order(&identity, order_id).await?;
    Ok(Json(Envelope::data(view.into())))
}

/// PUT /api/commandes/{id}/status: move the order along its lifecycle.
pub async fn update_status<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateStatusBody>,
) -> OrderResponse {
    let order_id = parse_id(&id, OrderId::parse)?;
    let target = body
        .status
        .parse::<OrderStatus>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let view = state
        .orders
        .update_status(&identity, order_id, target)
        .await?;
    Ok(Json(Envelope::with_message(
        format!("Order status changed to {target}"),
        view.into(),
    )))
}

/// POST /api/commandes/{id}/cancel: buyer cancels a pending order.
///
/// The body is optional; `{ "reason": "..." }` is recorded when present.
pub async fn cancel<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    body: Option<ApiJson<CancelBody>>,
) -> OrderResponse {
    let order_id = parse_id(&id, OrderId::parse)?;
    let body = body.map(|ApiJson(body)| body).unwrap_or_default();
    let view = state
        .orders
        .cancel_order(&identity, order_id, body.reason)
        .await?;
    Ok(Json(Envelope::with_message("Order cancelled", view.into())))
}

/// PUT /api/commandes/{id}/payment: record the payment outcome.
pub async fn update_payment<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<PaymentStatusBody>,
) -> OrderResponse {
    let order_id = parse_id(&id, OrderId::parse)?;
    let payment_status = body
        .payment_status
        .parse::<PaymentStatus>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let view = state
        .orders
        .set_payment_status(&identity, order_id, payment_status)
        .await?;
    Ok(Json(Envelope::with_message(
        "Payment status updated",
        view.into(),
    )))
}
