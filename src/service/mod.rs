//! Service layer: event dispatch and outbound delivery.
//!
//! [`EventRouter`] resolves each event against the routing table and hands
//! one delivery per endpoint to an [`EventDelivery`] implementation.

pub mod delivery;
pub mod dispatcher;

pub use delivery::{DeliveryPolicy, EventDelivery, HttpDelivery};
pub use dispatcher::{DispatchMode, DispatchReport, EventRouter};
