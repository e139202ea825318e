//! Health and status DTOs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{EventCategory, PeerRole};

/// Response body for `GET /health`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"healthy"` while the process serves requests.
    pub status: String,
    /// Current server time (RFC 3339).
    pub timestamp: String,
    /// Crate version.
    pub version: String,
}

/// One routing table row.
#[derive(Debug, Serialize, ToSchema)]
pub struct RouteDto {
    /// Event category.
    pub category: EventCategory,
    /// Roles the category fans out to, in order.
    pub roles: Vec<PeerRole>,
}

/// Response body for `GET /mstatus`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    /// Crate version.
    pub version: String,
    /// `true` while the node accepts events.
    pub ok: bool,
    /// Address this node announces to its peers.
    pub self_address: String,
    /// Registered endpoints.
    pub subscriptions: usize,
    /// Deliveries currently running.
    pub in_flight: usize,
    /// Active routing policy.
    pub routes: Vec<RouteDto>,
}
