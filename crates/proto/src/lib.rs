//! Shared protocol types for the realtime gateway.
//!
//! This crate defines the identifier newtypes, identity claim, connection
//! descriptor, wire frames, and strongly-typed error enums shared across
//! the workspace.

pub mod descriptor;
pub mod error;
pub mod frame;
pub mod ident;

/// Re-export of the connection descriptor stored in the registry.
pub use descriptor::ConnectionDescriptor;
/// Re-export of all protocol error types.
pub use error::*;
/// Re-export of inbound/outbound wire frames.
pub use frame::{ClientFrame, ServerFrame};
/// Re-export of identifier and identity types.
pub use ident::{ConnectionId, IdentityClaim, RoomId, TenantId};
