//! Registry contract shared by the Redis store and the in-memory double.

use std::collections::HashMap;

use async_trait::async_trait;
use proto::{ConnectionDescriptor, ConnectionId, RegistryError, TenantId};

/// Derives the store key for a tenant's connection collection.
pub fn tenant_key(tenant: &TenantId) -> String {
    format!("tenant:{tenant}:connections")
}

/// Shared store mapping tenant → set of live connection descriptors.
///
/// Injected into the gateway as a capability so tests can substitute
/// [`crate::MemoryRegistry`]. All operations are idempotent: duplicate
/// registration is an upsert and unregistering an absent entry is not an
/// error, which makes duplicate disconnect delivery safe.
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Upserts the descriptor into the tenant's collection.
    async fn register(
        &self,
        tenant: &TenantId,
        connection_id: &ConnectionId,
        descriptor: &ConnectionDescriptor,
    ) -> Result<(), RegistryError>;

    /// Removes the connection's entry; absence is not an error.
    async fn unregister(
        &self,
        tenant: &TenantId,
        connection_id: &ConnectionId,
    ) -> Result<(), RegistryError>;

    /// Returns the tenant's live connections, empty when the tenant has
    /// none or the key does not exist.
    async fn list_connections(
        &self,
        tenant: &TenantId,
    ) -> Result<HashMap<ConnectionId, ConnectionDescriptor>, RegistryError>;
}
