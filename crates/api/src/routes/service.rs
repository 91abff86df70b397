//! Service endpoints: banner, liveness, and Prometheus metrics.

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health: returns system health status.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Serialize)]
pub struct BannerEndpoints {
    pub lapins: &'static str,
    pub categories: &'static str,
    pub commandes: &'static str,
    pub profiles: &'static str,
}

#[derive(Serialize)]
pub struct BannerResponse {
    pub success: bool,
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: BannerEndpoints,
}

/// GET /: names the service and its resource roots.
pub async fn banner() -> Json<BannerResponse> {
    Json(BannerResponse {
        success: true,
        message: "Livestock marketplace API",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: BannerEndpoints {
            lapins: "/api/lapins",
            categories: "/api/categories",
            commandes: "/api/commandes",
            profiles: "/api/profiles",
        },
    })
}

/// GET /metrics: the Prometheus text exposition of every recorded metric.
pub async fn metrics(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], handle.render())
}
