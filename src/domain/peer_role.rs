//! Classes of destination endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identifies what kind of node a subscriber endpoint fronts.
///
/// Distinct from [`super::EventCategory`]: the routing table maps
/// categories to the roles that must receive them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PeerRole {
    /// Room controller.
    Room,
    /// User interface.
    Ui,
    /// Translation service bridging to external systems.
    Translator,
}

impl PeerRole {
    /// Every role, in declaration order.
    pub const ALL: [Self; 3] = [Self::Room, Self::Ui, Self::Translator];

    /// Returns the wire name of this role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Room => "room",
            Self::Ui => "ui",
            Self::Translator => "translator",
        }
    }
}

impl fmt::Display for PeerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PeerRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("unknown peer role: {needle}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_agree() {
        for role in PeerRole::ALL {
            assert_eq!(role.to_string().parse::<PeerRole>(), Ok(role));
        }
    }

    #[test]
    fn unknown_role_fails() {
        assert!("printer".parse::<PeerRole>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&PeerRole::Translator).unwrap_or_default();
        assert_eq!(json, "\"translator\"");
    }
}
