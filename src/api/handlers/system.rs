//! System endpoints: health check and node status.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{HealthResponse, RouteDto, StatusResponse};
use crate::app_state::AppState;

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /mstatus`: Node status.
#[utoipa::path(
    get,
    path = "/mstatus",
    tag = "System",
    summary = "Node status",
    description = "Reports the announced self address, registry size, in-flight deliveries and the active routing policy.",
    responses(
        (status = 200, description = "Node status", body = StatusResponse),
    )
)]
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let router = &state.router;
    let routes = router
        .routing_table()
        .categories()
        .map(|(category, roles)| RouteDto {
            category,
            roles: roles.to_vec(),
        })
        .collect();
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        ok: router.is_accepting(),
        self_address: state.self_address.to_string(),
        subscriptions: router.registry().len(),
        in_flight: router.in_flight(),
        routes,
    })
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/mstatus", get(status_handler))
}
