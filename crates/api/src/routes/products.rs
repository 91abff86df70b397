//! Product catalog endpoints (`/api/lapins`).

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{CategoryId, ProductId};
use store::Store;

use crate::dto::{
    CategoryDto, CategoryListing, CreateProductBody, Envelope, ListParams, ProductDto,
    ProductListResponse, UpdateProductBody,
};
use crate::error::ApiError;
use crate::extract::{ApiJson, Caller, parse_id};
use crate::state::AppState;

/// GET /api/lapins: public listing with filters, pagination, and totals.
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<ProductListResponse<Vec<ProductDto>>>, ApiError> {
    let page = state.catalog.list_products(&params.to_query()).await?;
    let data = page.products.iter().cloned().map(ProductDto::from).collect();
    Ok(Json(ProductListResponse::new(&page, data)))
}

/// GET /api/lapins/category/{id}: public listing of one category.
pub async fn by_category<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<ProductListResponse<CategoryListing>>, ApiError> {
    let category_id = parse_id(&id, CategoryId::parse)?;
    let (category, page) = state
        .catalog
        .list_products_by_category(category_id, params.to_query())
        .await?;
    let listing = CategoryListing {
        category: CategoryDto::from(category),
        lapins: page.products.iter().cloned().map(ProductDto::from).collect(),
    };
    Ok(Json(ProductListResponse::new(&page, listing)))
}

/// GET /api/lapins/mes-lapins: every product of the calling seller.
pub async fn mine<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
) -> Result<Json<Envelope<Vec<ProductDto>>>, ApiError> {
    let products = state.catalog.list_my_products(&identity).await?;
    Ok(Json(Envelope::data(
        products.into_iter().map(ProductDto::from).collect(),
    )))
}

/// GET /api/lapins/{id}
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<ProductDto>>, ApiError> {
    let product_id = parse_id(&id, ProductId::parse)?;
    let details = state.catalog.get_product(product_id).await?;
    Ok(Json(Envelope::data(details.into())))
}

/// POST /api/lapins
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    ApiJson(body): ApiJson<CreateProductBody>,
) -> Result<(StatusCode, Json<Envelope<ProductDto>>), ApiError> {
    let product = state.catalog.create_product(&identity, body.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "Product created successfully",
            product.into(),
        )),
    ))
}

/// PUT /api/lapins/{id}
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateProductBody>,
) -> Result<Json<Envelope<ProductDto>>, ApiError> {
    let product_id = parse_id(&id, ProductId::parse)?;
    let product = state
        .catalog
        .update_product(&identity, product_id, body.into())
        .await?;
    Ok(Json(Envelope::with_message(
        "Product updated successfully",
        product.into(),
    )))
}

/// DELETE /api/lapins/{id}
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
) -> Result<Json<Envelope<ProductDto>>, ApiError> {
    let product_id = parse_id(&id, ProductId::parse)?;
    let product = state.catalog.delete_product(&identity, product_id).await?;
    Ok(Json(Envelope::with_message(
        "Product deleted successfully",
        product.into(),
    )))
}
