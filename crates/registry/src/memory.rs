//! In-memory registry double for tests and store-less development runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use proto::{ConnectionDescriptor, ConnectionId, RegistryError, TenantId};

use crate::store::ConnectionRegistry;

/// DashMap-backed registry with the same idempotence semantics as the
/// Redis store. An outage can be simulated with [`MemoryRegistry::set_unavailable`].
#[derive(Default)]
pub struct MemoryRegistry {
    tenants: DashMap<TenantId, HashMap<ConnectionId, ConnectionDescriptor>>,
    unavailable: AtomicBool,
}

impl MemoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a store outage: subsequent calls fail with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RegistryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("simulated outage".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ConnectionRegistry for MemoryRegistry {
    async fn register(
        &self,
        tenant: &TenantId,
        connection_id: &ConnectionId,
        descriptor: &ConnectionDescriptor,
    ) -> Result<(), RegistryError> {
        self.check_available()?;
        self.tenants
            .entry(tenant.clone())
            .or_default()
            .insert(connection_id.clone(), descriptor.clone());
        Ok(())
    }

    async fn unregister(
        &self,
        tenant: &TenantId,
        connection_id: &ConnectionId,
    ) -> Result<(), RegistryError> {
        self.check_available()?;
        if let Some(mut connections) = self.tenants.get_mut(tenant) {
            connections.remove(connection_id);
        }
        Ok(())
    }

    async fn list_connections(
        &self,
        tenant: &TenantId,
    ) -> Result<HashMap<ConnectionId, ConnectionDescriptor>, RegistryError> {
        self.check_available()?;
        Ok(self
            .tenants
            .get(tenant)
            .map(|connections| connections.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: &str) -> ConnectionDescriptor {
        ConnectionDescriptor::new(ConnectionId::from(id))
    }

    #[tokio::test]
    async fn register_then_list_returns_descriptor() {
        let registry = MemoryRegistry::new();
        let tenant = TenantId::from("acme");
        let connection_id = ConnectionId::from("c1");

        registry
            .register(&tenant, &connection_id, &descriptor("c1"))
            .await
            .expect("register");

        let connections = registry.list_connections(&tenant).await.expect("list");
        assert_eq!(connections.len(), 1);
        assert!(connections.contains_key(&connection_id));
    }

    #[tokio::test]
    async fn register_is_an_idempotent_upsert() {
        let registry = MemoryRegistry::new();
        let tenant = TenantId::from("acme");
        let connection_id = ConnectionId::from("c1");

        for _ in 0..2 {
            registry
                .register(&tenant, &connection_id, &descriptor("c1"))
                .await
                .expect("register");
        }

        let connections = registry.list_connections(&tenant).await.expect("list");
        assert_eq!(connections.len(), 1);
    }

    #[tokio::test]
    async fn unregister_twice_is_a_no_op_after_the_first_call() {
        let registry = MemoryRegistry::new();
        let tenant = TenantId::from("acme");
        let connection_id = ConnectionId::from("c1");

        registry
            .register(&tenant, &connection_id, &descriptor("c1"))
            .await
            .expect("register");
        registry
            .unregister(&tenant, &connection_id)
            .await
            .expect("first unregister");
        registry
            .unregister(&tenant, &connection_id)
            .await
            .expect("duplicate unregister should succeed");

        let connections = registry.list_connections(&tenant).await.expect("list");
        assert!(connections.is_empty());
    }

    #[tokio::test]
    async fn list_connections_for_unknown_tenant_is_empty_not_an_error() {
        let registry = MemoryRegistry::new();
        let connections = registry
            .list_connections(&TenantId::from("ghost"))
            .await
            .expect("list");
        assert!(connections.is_empty());
    }

    #[tokio::test]
    async fn tenants_are_isolated_from_each_other() {
        let registry = MemoryRegistry::new();
        registry
            .register(
                &TenantId::from("acme"),
                &ConnectionId::from("c1"),
                &descriptor("c1"),
            )
            .await
            .expect("register");

        let other = registry
            .list_connections(&TenantId::from("globex"))
            .await
            .expect("list");
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn simulated_outage_fails_with_unavailable() {
        let registry = MemoryRegistry::new();
        registry.set_unavailable(true);

        let err = registry
            .list_connections(&TenantId::from("acme"))
            .await
            .expect_err("outage should fail");
        assert!(matches!(err, RegistryError::Unavailable(_)));
    }
}
