//! Subscription handlers: register and list endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{SubscribeResponse, SubscriptionListResponse};
use crate::api::extract::ValidatedJson;
use crate::app_state::AppState;
use crate::domain::ConnectionRequest;
use crate::error::{ErrorResponse, RouterError};

/// `POST /subscribe`: Register a subscriber endpoint.
///
/// This is the endpoint peers hit with their handshake. Re-registering
/// the same `(role, subscriber-endpoint)` replaces the earlier entry. A
/// payload without `role` registers under the node's default peer role.
///
/// # Errors
///
/// Returns [`RouterError::Validation`] for a malformed request; the
/// registry is left untouched.
#[utoipa::path(
    post,
    path = "/subscribe",
    tag = "Subscriptions",
    summary = "Register a subscriber",
    description = "Accepts a handshake payload and registers its `subscriber-endpoint` under `role`. Answers `200 OK` once the endpoint is visible to dispatch.",
    request_body = ConnectionRequest,
    responses(
        (status = 200, description = "Endpoint registered", body = SubscribeResponse),
        (status = 400, description = "Malformed handshake payload", body = ErrorResponse),
    )
)]
pub async fn subscribe(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ConnectionRequest>,
) -> Result<impl IntoResponse, RouterError> {
    let endpoint = request.into_endpoint(state.default_peer_role)?;
    let registration = state.router.registry().register(endpoint.clone()).await?;
    Ok((
        StatusCode::OK,
        Json(SubscribeResponse::new(registration, endpoint)),
    ))
}

/// `GET /subscriptions`: List registered endpoints.
#[utoipa::path(
    get,
    path = "/subscriptions",
    tag = "Subscriptions",
    summary = "List subscribers",
    description = "Returns every registered endpoint, grouped by role.",
    responses(
        (status = 200, description = "Registered endpoints", body = SubscriptionListResponse),
    )
)]
pub async fn list_subscriptions(State(state): State<AppState>) -> impl IntoResponse {
    let subscriptions = state.router.registry().endpoints();
    Json(SubscriptionListResponse {
        total: subscriptions.len(),
        subscriptions,
    })
}

/// Subscription routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/subscribe", post(subscribe))
        .route("/subscriptions", get(list_subscriptions))
}
