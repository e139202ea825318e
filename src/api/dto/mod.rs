//! Data Transfer Objects for REST request/response serialization.
//!
//! Request bodies are domain types ([`crate::domain::Event`],
//! [`crate::domain::ConnectionRequest`]) deserialized directly; only
//! responses need dedicated shapes.

pub mod status_dto;
pub mod subscription_dto;

pub use status_dto::*;
pub use subscription_dto::*;
