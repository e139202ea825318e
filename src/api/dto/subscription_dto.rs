//! Subscription DTOs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Registration, SubscriberEndpoint};

/// Response body for `POST /subscribe`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubscribeResponse {
    /// `"added"` for a new endpoint, `"replaced"` when an existing
    /// `(role, address)` entry was superseded.
    pub status: &'static str,
    /// The endpoint as stored.
    pub endpoint: SubscriberEndpoint,
}

impl SubscribeResponse {
    /// Builds the response for a completed registration.
    #[must_use]
    pub fn new(registration: Registration, endpoint: SubscriberEndpoint) -> Self {
        let status = match registration {
            Registration::Added => "added",
            Registration::Replaced => "replaced",
        };
        Self { status, endpoint }
    }
}

/// Response body for `GET /subscriptions`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionListResponse {
    /// Number of registered endpoints.
    pub total: usize,
    /// Endpoints grouped by role.
    pub subscriptions: Vec<SubscriberEndpoint>,
}
