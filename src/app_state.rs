//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::PeerRole;
use crate::service::EventRouter;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Dispatch engine; also owns the registry handle and routing table.
    pub router: Arc<EventRouter>,
    /// Address this node announces to its peers.
    pub self_address: Arc<str>,
    /// Role assumed for a handshake that does not name one.
    pub default_peer_role: PeerRole,
}
