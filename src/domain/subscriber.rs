//! Subscriber endpoints and the handshake payload that creates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::PeerRole;
use crate::error::RouterError;

/// A remote address eligible to receive events for one role.
///
/// Endpoints are never patched: registering the same `(role, address)`
/// again replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SubscriberEndpoint {
    /// Role the endpoint receives events for.
    pub role: PeerRole,
    /// Callback URL events are POSTed to.
    pub address: String,
    /// Opaque filter tags forwarded with every delivery.
    pub filters: Vec<String>,
    /// Publisher address announced by the peer during its handshake.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher_address: Option<String>,
    /// When this registration was accepted.
    pub registered_at: DateTime<Utc>,
}

impl SubscriberEndpoint {
    /// Creates an endpoint with no filters, stamped with the current time.
    #[must_use]
    pub fn new(role: PeerRole, address: impl Into<String>) -> Self {
        Self {
            role,
            address: address.into(),
            filters: Vec::new(),
            publisher_address: None,
            registered_at: Utc::now(),
        }
    }

    /// Replaces the filter tags. Blank tags and repeats are dropped while
    /// keeping first-seen order.
    #[must_use]
    pub fn with_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tags: Vec<String> = Vec::new();
        for tag in filters.into_iter().map(Into::into) {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        self.filters = tags;
        self
    }

    /// Records the publisher address the peer announced.
    #[must_use]
    pub fn with_publisher(mut self, publisher_address: impl Into<String>) -> Self {
        self.publisher_address = Some(publisher_address.into());
        self
    }

    /// Checks the endpoint is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Validation`] if the address is blank.
    pub fn validate(&self) -> Result<(), RouterError> {
        if self.address.trim().is_empty() {
            return Err(RouterError::Validation(format!(
                "subscriber address for role {} must not be empty",
                self.role
            )));
        }
        Ok(())
    }

    /// `true` for endpoints a peer registered through a handshake.
    ///
    /// Peer endpoints are other routers; everything else (static
    /// subscriptions) is a local consumer.
    #[must_use]
    pub fn is_peer(&self) -> bool {
        self.publisher_address.is_some()
    }
}

/// Handshake payload sent to a peer's `/subscribe` endpoint.
///
/// Asks the peer to register `subscriber_endpoint` as a destination for
/// `role`. A full bidirectional link needs one request in each direction.
///
/// `role` and `filters` extend the two-field payload of older nodes. A
/// request without `role` is registered under the receiver's default peer
/// role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub struct ConnectionRequest {
    /// `host:port` the sender publishes from.
    pub publisher_address: String,
    /// Callback URL the peer should deliver events to.
    pub subscriber_endpoint: String,
    /// Role the sender wants to be registered under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<PeerRole>,
    /// Opaque filter tags the peer forwards with every delivery.
    #[serde(default)]
    pub filters: Vec<String>,
}

impl ConnectionRequest {
    /// Converts the request into the endpoint the receiving side registers,
    /// using `default_role` when the sender named none.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Validation`] if either address is blank.
    pub fn into_endpoint(
        self,
        default_role: PeerRole,
    ) -> Result<SubscriberEndpoint, RouterError> {
        if self.publisher_address.trim().is_empty() {
            return Err(RouterError::Validation(
                "publisher-address must not be empty".to_string(),
            ));
        }
        if self.subscriber_endpoint.trim().is_empty() {
            return Err(RouterError::Validation(
                "subscriber-endpoint must not be empty".to_string(),
            ));
        }
        let role = self.role.unwrap_or(default_role);
        let endpoint = SubscriberEndpoint::new(role, self.subscriber_endpoint.trim())
            .with_filters(self.filters)
            .with_publisher(self.publisher_address.trim());
        Ok(endpoint)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn request() -> ConnectionRequest {
        ConnectionRequest {
            publisher_address: "10.0.0.4:7000".to_string(),
            subscriber_endpoint: "http://10.0.0.4:6999/deliver".to_string(),
            role: Some(PeerRole::Ui),
            filters: vec!["room-101".to_string()],
        }
    }

    #[test]
    fn wire_format_uses_kebab_case_keys() {
        let json = serde_json::to_value(request()).unwrap_or_default();
        assert_eq!(json["publisher-address"], "10.0.0.4:7000");
        assert_eq!(json["subscriber-endpoint"], "http://10.0.0.4:6999/deliver");
        assert_eq!(json["role"], "ui");
    }

    #[test]
    fn filters_default_to_empty() {
        let raw =
            r#"{"publisher-address":"a:7000","subscriber-endpoint":"a:6999","role":"room"}"#;
        let Ok(req) = serde_json::from_str::<ConnectionRequest>(raw) else {
            panic!("request should parse");
        };
        assert!(req.filters.is_empty());
    }

    #[test]
    fn into_endpoint_carries_everything() {
        let Ok(endpoint) = request().into_endpoint(PeerRole::Room) else {
            panic!("valid request");
        };
        assert_eq!(endpoint.role, PeerRole::Ui);
        assert_eq!(endpoint.address, "http://10.0.0.4:6999/deliver");
        assert_eq!(endpoint.filters, vec!["room-101".to_string()]);
        assert_eq!(endpoint.publisher_address.as_deref(), Some("10.0.0.4:7000"));
    }

    #[test]
    fn two_field_payload_uses_default_role() {
        let raw = r#"{"publisher-address":"10.0.0.9:7000","subscriber-endpoint":"10.0.0.9:6999"}"#;
        let Ok(req) = serde_json::from_str::<ConnectionRequest>(raw) else {
            panic!("two-field payload should parse");
        };
        assert_eq!(req.role, None);
        let Ok(endpoint) = req.into_endpoint(PeerRole::Translator) else {
            panic!("valid request");
        };
        assert_eq!(endpoint.role, PeerRole::Translator);
        assert!(endpoint.is_peer());
    }

    #[test]
    fn static_endpoints_are_not_peers() {
        assert!(!SubscriberEndpoint::new(PeerRole::Ui, "http://u/event").is_peer());
    }

    #[test]
    fn blank_subscriber_endpoint_is_invalid() {
        let mut req = request();
        req.subscriber_endpoint = "  ".to_string();
        assert!(matches!(
            req.into_endpoint(PeerRole::Ui),
            Err(RouterError::Validation(_))
        ));
    }

    #[test]
    fn blank_publisher_address_is_invalid() {
        let mut req = request();
        req.publisher_address = String::new();
        assert!(matches!(
            req.into_endpoint(PeerRole::Ui),
            Err(RouterError::Validation(_))
        ));
    }

    #[test]
    fn filters_are_trimmed_and_deduplicated() {
        let endpoint = SubscriberEndpoint::new(PeerRole::Room, "http://r/event")
            .with_filters(["a", " b ", "", "a"]);
        assert_eq!(endpoint.filters, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn validate_rejects_empty_address() {
        assert!(SubscriberEndpoint::new(PeerRole::Ui, "").validate().is_err());
        assert!(SubscriberEndpoint::new(PeerRole::Ui, "http://u/event").validate().is_ok());
    }
}
