//! OpenAPI document for the HTTP surface.

use utoipa::OpenApi;

use crate::api::dto::{
    HealthResponse, RouteDto, StatusResponse, SubscribeResponse, SubscriptionListResponse,
};
use crate::api::handlers::{event, subscription, system};
use crate::domain::{ConnectionRequest, Event, EventCategory, PeerRole, SubscriberEndpoint};
use crate::error::{ErrorBody, ErrorResponse};
use crate::service::DispatchReport;

/// Generated OpenAPI description, served at `/api-docs/openapi.json`.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "event-router", description = "Category-based event routing between fleet nodes."),
    paths(
        event::publish_event,
        event::deliver_event,
        subscription::subscribe,
        subscription::list_subscriptions,
        system::health_handler,
        system::status_handler,
    ),
    components(schemas(
        Event,
        EventCategory,
        PeerRole,
        ConnectionRequest,
        SubscriberEndpoint,
        DispatchReport,
        SubscribeResponse,
        SubscriptionListResponse,
        HealthResponse,
        StatusResponse,
        RouteDto,
        ErrorResponse,
        ErrorBody,
    )),
    tags(
        (name = "Events", description = "Event ingestion and fan-out"),
        (name = "Subscriptions", description = "Peer handshakes and registered endpoints"),
        (name = "System", description = "Health and status"),
    )
)]
pub struct ApiDoc;
