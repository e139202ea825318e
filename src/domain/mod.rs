//! Domain layer: events, peer roles, routing policy, and the subscription
//! registry.
//!
//! Everything here is transport-agnostic. The HTTP layer and the link
//! layer build on these types but nothing in this module knows about them.

pub mod event;
pub mod peer_role;
pub mod registry;
pub mod routing_table;
pub mod subscriber;

pub use event::{Event, EventCategory};
pub use peer_role::PeerRole;
pub use registry::{Registration, RegistryView, SubscriptionRegistry};
pub use routing_table::RoutingTable;
pub use subscriber::{ConnectionRequest, SubscriberEndpoint};
