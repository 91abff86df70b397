//! Category endpoints (`/api/categories`).

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::CategoryId;
use store::Store;

use crate::dto::{CategoryDto, CategoryStatsDto, CreateCategoryBody, Envelope, RecomputeDto};
use crate::error::ApiError;
use crate::extract::{ApiJson, Caller, parse_id};
use crate::state::AppState;

/// GET /api/categories: active categories by name.
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Envelope<Vec<CategoryDto>>>, ApiError> {
    let categories = state.catalog.list_categories().await?;
    Ok(Json(Envelope::data(
        categories.into_iter().map(CategoryDto::from).collect(),
    )))
}

/// POST /api/categories
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    ApiJson(body): ApiJson<CreateCategoryBody>,
) -> Result<(StatusCode, Json<Envelope<CategoryDto>>), ApiError> {
    let category = state
        .catalog
        .create_category(&identity, &body.name, body.description)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "Category created successfully",
            category.into(),
        )),
    ))
}

/// GET /api/categories/stats
pub async fn stats<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Envelope<Vec<CategoryStatsDto>>>, ApiError> {
    let stats = state.catalog.category_stats().await?;
    Ok(Json(Envelope::data(
        stats.into_iter().map(CategoryStatsDto::from).collect(),
    )))
}

/// POST /api/categories/{id}/recompute: rebuild a category's stock total.
pub async fn recompute<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
) -> Result<Json<Envelope<RecomputeDto>>, ApiError> {
    let category_id = parse_id(&id, CategoryId::parse)?;
    let stock_total = state
        .catalog
        .recompute_category(&identity, category_id)
        .await?;
    Ok(Json(Envelope::data(RecomputeDto {
        category_id,
        stock_total,
    })))
}
