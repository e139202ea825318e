//! Categorized events forwarded through the router.
//!
//! An [`Event`] is never inspected beyond its [`EventCategory`]: the
//! payload is an opaque JSON value that is forwarded verbatim to every
//! resolved subscriber.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Closed set of event categories. The category alone decides fan-out.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// State change reported by a room controller.
    Room,
    /// Feature toggle or interaction reported by a user interface.
    UiFeature,
    /// A device API call completed successfully.
    ApiSuccess,
    /// A device API call failed.
    ApiError,
    /// Event originating outside the fleet.
    External,
    /// Telemetry sample.
    Metrics,
}

impl EventCategory {
    /// Every category, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Room,
        Self::UiFeature,
        Self::ApiSuccess,
        Self::ApiError,
        Self::External,
        Self::Metrics,
    ];

    /// Returns the wire name of this category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Room => "room",
            Self::UiFeature => "ui_feature",
            Self::ApiSuccess => "api_success",
            Self::ApiError => "api_error",
            Self::External => "external",
            Self::Metrics => "metrics",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("unknown event category: {needle}"))
    }
}

/// A categorized message. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Event {
    /// Fan-out selector.
    pub category: EventCategory,
    /// Opaque body, forwarded without modification.
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
}

impl Event {
    /// Creates a new event.
    #[must_use]
    pub fn new(category: EventCategory, payload: serde_json::Value) -> Self {
        Self { category, payload }
    }
}
