//! Event ingestion handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::extract::ValidatedJson;
use crate::app_state::AppState;
use crate::domain::Event;
use crate::error::{ErrorResponse, RouterError};
use crate::service::DispatchReport;

/// `POST /event`: Route an event to its subscribers.
///
/// # Errors
///
/// Returns [`RouterError::Validation`] for a malformed body or unknown
/// category, and [`RouterError::ShuttingDown`] while the node drains.
#[utoipa::path(
    post,
    path = "/event",
    tag = "Events",
    summary = "Publish an event",
    description = "Resolves the event category against the routing table and forwards the event to every endpoint registered under each resolved role. In `await` mode the response carries the delivery tally; in `detached` mode only the number of deliveries scheduled.",
    request_body = Event,
    responses(
        (status = 200, description = "Event dispatched", body = DispatchReport),
        (status = 400, description = "Malformed event or unknown category", body = ErrorResponse),
        (status = 503, description = "Node is shutting down", body = ErrorResponse),
    )
)]
pub async fn publish_event(
    State(state): State<AppState>,
    ValidatedJson(event): ValidatedJson<Event>,
) -> Result<impl IntoResponse, RouterError> {
    let report = state.router.handle_event(event).await?;
    Ok((StatusCode::OK, Json(report)))
}

/// `POST /deliver`: Accept an event forwarded by a peer router.
///
/// Only endpoints that were not registered by a peer handshake receive
/// it, so an event crosses each router link at most once.
///
/// # Errors
///
/// Same as [`publish_event`].
#[utoipa::path(
    post,
    path = "/deliver",
    tag = "Events",
    summary = "Accept a forwarded event",
    description = "Target of the `subscriber-endpoint` a node announces in its handshake. Routes the event like `/event` but skips endpoints registered by peer routers.",
    request_body = Event,
    responses(
        (status = 200, description = "Event dispatched to local consumers", body = DispatchReport),
        (status = 400, description = "Malformed event or unknown category", body = ErrorResponse),
        (status = 503, description = "Node is shutting down", body = ErrorResponse),
    )
)]
pub async fn deliver_event(
    State(state): State<AppState>,
    ValidatedJson(event): ValidatedJson<Event>,
) -> Result<impl IntoResponse, RouterError> {
    let report = state.router.handle_delivery(event).await?;
    Ok((StatusCode::OK, Json(report)))
}

/// Event routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/event", post(publish_event))
        .route("/deliver", post(deliver_event))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::api::build_router;
    use crate::api::testing::{json_body, post_json, test_state};
    use crate::domain::{EventCategory, PeerRole, SubscriberEndpoint};

    #[tokio::test]
    async fn routes_event_to_registered_role() {
        let (state, recorder) = test_state();
        let registered = state
            .router
            .registry()
            .register(SubscriberEndpoint::new(PeerRole::Ui, "http://ui-1/event"))
            .await;
        assert!(registered.is_ok());

        let app = build_router().with_state(state);
        let response = app
            .oneshot(post_json("/event", r#"{"category":"room","payload":"p"}"#))
            .await;
        let Ok(response) = response else {
            panic!("request failed");
        };
        assert_eq!(response.status(), 200);

        let body = json_body(response).await;
        assert_eq!(body["category"], "room");
        assert_eq!(body["attempted"], 1);
        assert_eq!(body["succeeded"], 1);
        assert_eq!(
            recorder.deliveries(),
            vec![("http://ui-1/event".to_string(), EventCategory::Room)]
        );
    }

    #[tokio::test]
    async fn forwarded_event_reaches_only_local_consumers() {
        let (state, recorder) = test_state();
        for endpoint in [
            SubscriberEndpoint::new(PeerRole::Ui, "http://ui-1/event"),
            SubscriberEndpoint::new(PeerRole::Ui, "http://10.0.0.5:6999/deliver")
                .with_publisher("10.0.0.5:7000"),
        ] {
            assert!(state.router.registry().register(endpoint).await.is_ok());
        }

        let app = build_router().with_state(state);
        let Ok(response) = app
            .oneshot(post_json("/deliver", r#"{"category":"room","payload":"p"}"#))
            .await
        else {
            panic!("request failed");
        };
        assert_eq!(response.status(), 200);
        assert_eq!(json_body(response).await["attempted"], 1);
        assert_eq!(
            recorder.deliveries(),
            vec![("http://ui-1/event".to_string(), EventCategory::Room)]
        );
    }

    #[tokio::test]
    async fn unknown_category_is_a_validation_error() {
        let (state, recorder) = test_state();
        let app = build_router().with_state(state);
        let Ok(response) = app
            .oneshot(post_json("/event", r#"{"category":"heartbeat","payload":1}"#))
            .await
        else {
            panic!("request failed");
        };
        assert_eq!(response.status(), 400);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], 1001);
        assert!(recorder.deliveries().is_empty());
    }

    #[tokio::test]
    async fn malformed_json_uses_error_shape() {
        let (state, _) = test_state();
        let app = build_router().with_state(state);
        let Ok(response) = app.oneshot(post_json("/event", "{not json")).await else {
            panic!("request failed");
        };
        assert_eq!(response.status(), 400);
        let body = json_body(response).await;
        assert!(body["error"]["message"].is_string());
    }

    #[tokio::test]
    async fn draining_node_answers_503() {
        let (state, _) = test_state();
        assert!(state.router.drain(Duration::from_millis(1)).await);
        let app = build_router().with_state(state);
        let request = Request::post("/event")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"category":"metrics","payload":{}}"#));
        let Ok(request) = request else {
            panic!("request builder failed");
        };
        let Ok(response) = app.oneshot(request).await else {
            panic!("request failed");
        };
        assert_eq!(response.status(), 503);
        assert_eq!(json_body(response).await["error"]["code"], 3003);
    }
}
