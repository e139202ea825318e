//! Fixtures shared by the handler tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::Request;
use axum::response::Response;

use crate::app_state::AppState;
use crate::domain::{
    Event, EventCategory, PeerRole, RoutingTable, SubscriberEndpoint, SubscriptionRegistry,
};
use crate::error::DeliveryError;
use crate::service::{EventDelivery, EventRouter};

/// Accepts every delivery and remembers where it went.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    seen: Mutex<Vec<(String, EventCategory)>>,
}

impl Recorder {
    pub(crate) fn deliveries(&self) -> Vec<(String, EventCategory)> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EventDelivery for Recorder {
    async fn deliver(
        &self,
        endpoint: &SubscriberEndpoint,
        event: &Event,
    ) -> Result<(), DeliveryError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push((endpoint.address.clone(), event.category));
        }
        Ok(())
    }
}

/// State with the default routing table, an empty registry, and a
/// recording delivery.
pub(crate) fn test_state() -> (AppState, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let delivery: Arc<dyn EventDelivery> = Arc::<Recorder>::clone(&recorder);
    let router = EventRouter::new(
        Arc::new(RoutingTable::default()),
        SubscriptionRegistry::spawn(16),
        delivery,
    );
    let state = AppState {
        router: Arc::new(router),
        self_address: Arc::from("127.0.0.1"),
        default_peer_role: PeerRole::Ui,
    };
    (state, recorder)
}

#[allow(clippy::panic)]
pub(crate) fn post_json(path: &str, body: &str) -> Request<Body> {
    let Ok(request) = Request::post(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
    else {
        panic!("request builder failed");
    };
    request
}

#[allow(clippy::panic)]
pub(crate) async fn json_body(response: Response) -> serde_json::Value {
    let Ok(bytes) = to_bytes(response.into_body(), usize::MAX).await else {
        panic!("body read failed");
    };
    let Ok(value) = serde_json::from_slice(&bytes) else {
        panic!("body is not JSON");
    };
    value
}
