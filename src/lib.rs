//! # event-router
//!
//! Routing core of a distributed event bus. Every node in the fleet runs one
//! instance; instances accept categorized events over HTTP and forward each
//! one to the peer roles its category maps to.
//!
//! ## Architecture
//!
//! ```text
//! Peers (HTTP)
//!     │
//!     ├── REST Handlers (api/)         POST /event, POST /subscribe
//!     │
//!     ├── EventRouter (service/)       category → roles → endpoints
//!     ├── RoutingTable (domain/)       immutable fan-out policy
//!     ├── SubscriptionRegistry (domain/)  single-writer command queue
//!     │
//!     ├── ConnectionEstablisher (link/)   handshake retry every 5 s
//!     └── AddressResolver (link/)         interface → dev host → prod host
//! ```
//!
//! [`node::Node`] wires the pieces together from a
//! [`config::RouterConfig`].

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod link;
pub mod node;
pub mod service;
pub mod shutdown;
