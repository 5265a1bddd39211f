//! Tenant-scoped connection registry backed by a shared external store.
//!
//! The registry is best-effort bookkeeping, not a gate: callers log
//! failures and keep the connection alive.

pub mod memory;
pub mod redis_store;
pub mod store;

/// In-memory registry used as a test double.
pub use memory::MemoryRegistry;
/// Redis-backed registry over a shared connection manager.
pub use redis_store::RedisRegistry;
/// Registry trait and key derivation.
pub use store::{ConnectionRegistry, tenant_key};
