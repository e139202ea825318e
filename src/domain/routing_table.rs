//! Static category → roles fan-out policy.
//!
//! [`RoutingTable`] is built once at startup and never mutated. It is
//! shared behind an `Arc` and read without locking on every dispatch.

use std::collections::BTreeMap;

use super::{EventCategory, PeerRole};
use crate::error::RouterError;

/// Maps each [`EventCategory`] to the ordered roles that must receive it.
///
/// A category missing from the table has no destinations: events of that
/// category are dropped without error. Duplicate roles are preserved and
/// produce duplicate deliveries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    routes: BTreeMap<EventCategory, Vec<PeerRole>>,
}

impl RoutingTable {
    /// Builds a table from `(category, roles)` pairs. Later pairs for the
    /// same category replace earlier ones.
    #[must_use]
    pub fn from_entries<I, R>(entries: I) -> Self
    where
        I: IntoIterator<Item = (EventCategory, R)>,
        R: IntoIterator<Item = PeerRole>,
    {
        let routes = entries
            .into_iter()
            .map(|(category, roles)| (category, roles.into_iter().collect()))
            .collect();
        Self { routes }
    }

    /// Parses a table from `category=role,role;category=role`.
    ///
    /// Whitespace around separators is ignored and empty segments are
    /// skipped, so a trailing `;` is accepted. A category with an empty role
    /// list is kept as an explicit "drop" entry.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Configuration`] on an unknown category or
    /// role, or on a segment without `=`.
    pub fn parse(raw: &str) -> Result<Self, RouterError> {
        let mut routes = BTreeMap::new();
        for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let Some((category, roles)) = segment.split_once('=') else {
                return Err(RouterError::Configuration(format!(
                    "routing entry `{segment}` is missing `=`"
                )));
            };
            let category: EventCategory =
                category.parse().map_err(RouterError::Configuration)?;
            let roles = roles
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(|r| r.parse::<PeerRole>().map_err(RouterError::Configuration))
                .collect::<Result<Vec<_>, _>>()?;
            routes.insert(category, roles);
        }
        Ok(Self { routes })
    }

    /// Returns the roles configured for `category`, or an empty slice.
    #[must_use]
    pub fn resolve(&self, category: EventCategory) -> &[PeerRole] {
        self.routes
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Iterates the configured entries in category order.
    pub fn categories(&self) -> impl Iterator<Item = (EventCategory, &[PeerRole])> {
        self.routes.iter().map(|(c, r)| (*c, r.as_slice()))
    }

    /// Number of configured categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no category is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for RoutingTable {
    /// The production fan-out policy.
    fn default() -> Self {
        use EventCategory as C;
        use PeerRole as R;

        Self::from_entries([
            (C::Room, vec![R::Ui]),
            (C::ApiSuccess, vec![R::Translator, R::Ui, R::Room]),
            (C::External, vec![R::Ui]),
            (C::ApiError, vec![R::Ui, R::Translator]),
            (C::Metrics, vec![R::Translator]),
            (C::UiFeature, vec![R::Room]),
        ])
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn missing_category_resolves_empty() {
        let table = RoutingTable::from_entries([(EventCategory::Room, [PeerRole::Ui])]);
        assert!(table.resolve(EventCategory::Metrics).is_empty());
    }

    #[test]
    fn resolve_preserves_order() {
        let table = RoutingTable::default();
        assert_eq!(
            table.resolve(EventCategory::ApiSuccess),
            &[PeerRole::Translator, PeerRole::Ui, PeerRole::Room]
        );
    }

    #[test]
    fn duplicates_are_kept() {
        let table =
            RoutingTable::from_entries([(EventCategory::Room, [PeerRole::Ui, PeerRole::Ui])]);
        assert_eq!(table.resolve(EventCategory::Room).len(), 2);
    }

    #[test]
    fn default_covers_every_category() {
        let table = RoutingTable::default();
        assert_eq!(table.len(), EventCategory::ALL.len());
    }

    #[test]
    fn parse_accepts_whitespace_and_trailing_separator() {
        let parsed = RoutingTable::parse(" room = ui ; api_error=ui, translator; ");
        let Ok(table) = parsed else {
            panic!("table should parse: {parsed:?}");
        };
        assert_eq!(table.resolve(EventCategory::Room), &[PeerRole::Ui]);
        assert_eq!(
            table.resolve(EventCategory::ApiError),
            &[PeerRole::Ui, PeerRole::Translator]
        );
        assert!(table.resolve(EventCategory::Metrics).is_empty());
    }

    #[test]
    fn parse_keeps_explicit_empty_entry() {
        let Ok(table) = RoutingTable::parse("metrics=") else {
            panic!("table should parse");
        };
        assert_eq!(table.len(), 1);
        assert!(table.resolve(EventCategory::Metrics).is_empty());
    }

    #[test]
    fn parse_rejects_unknown_names() {
        assert!(matches!(
            RoutingTable::parse("room=printer"),
            Err(RouterError::Configuration(_))
        ));
        assert!(matches!(
            RoutingTable::parse("heartbeat=ui"),
            Err(RouterError::Configuration(_))
        ));
        assert!(matches!(
            RoutingTable::parse("room"),
            Err(RouterError::Configuration(_))
        ));
    }
}
