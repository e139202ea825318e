//! Link layer: how this node finds its own address and subscribes itself
//! on its peers.

pub mod address;
pub mod establisher;

pub use address::{
    AddressResolver, InterfaceAddr, InterfaceSource, ResolutionStrategy, SystemInterfaces,
};
pub use establisher::{
    ConnectionEstablisher, EstablishReport, HANDSHAKE_RETRY_DELAY, HandshakeAborted,
    HandshakeTransport, HttpHandshake,
};
