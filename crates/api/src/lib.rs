//! HTTP API server for the livestock marketplace.
//!
//! Exposes the catalog, profile, and order services as REST endpoints, with
//! structured logging (tracing) and Prometheus metrics. Every response uses
//! the `{ success, message?, data }` envelope; failures carry
//! `{ success: false, message }`.

pub mod config;
pub mod dto;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
pub use crate::state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::service::metrics))
        .with_state(metrics_handle);

    let lapins = Router::new()
        .route(
            "/",
            get(routes::products::list::<S>).post(routes::products::create::<S>),
        )
        .route("/mes-lapins", get(routes::products::mine::<S>))
        .route("/category/{id}", get(routes::products::by_category::<S>))
        .route(
            "/{id}",
            get(routes::products::get::<S>)
                .put(routes::products::update::<S>)
                .delete(routes::products::delete::<S>),
        );

    let categories = Router::new()
        .route(
            "/",
            get(routes::categories::list::<S>).post(routes::categories::create::<S>),
        )
        .route("/stats", get(routes::categories::stats::<S>))
        .route("/{id}/recompute", post(routes::categories::recompute::<S>));

    let commandes = Router::new()
        .route("/", post(routes::orders::place::<S>))
        .route("/mes-commandes", get(routes::orders::mine::<S>))
        .route("/eleveur/mes-commandes", get(routes::orders::assigned::<S>))
        .route("/{id}", get(routes::orders::get::<S>))
        .route("/{id}/status", put(routes::orders::update_status::<S>))
        .route("/{id}/cancel", post(routes::orders::cancel::<S>))
        .route("/{id}/payment", put(routes::orders::update_payment::<S>));

    let profiles = Router::new()
        .route("/buyer", post(routes::profiles::register_buyer::<S>))
        .route("/seller", post(routes::profiles::register_seller::<S>))
        .route("/me", get(routes::profiles::me::<S>))
        .route(
            "/sellers/{id}/approve",
            post(routes::profiles::approve_seller::<S>),
        );

    Router::new()
        .route("/", get(routes::service::banner))
        .route("/health", get(routes::service::check))
        .nest("/api/lapins", lapins)
        .nest("/api/categories", categories)
        .nest("/api/commandes", commandes)
        .nest("/api/profiles", profiles)
        .with_state(state)
        .merge(metrics_router)
        .fallback(not_found)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
