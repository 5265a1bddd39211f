//! Redis-backed connection registry.
//!
//! One connection manager is established at process startup and shared by
//! all sessions; reconnect/retry behavior belongs to the client, not the
//! gateway. When the store cannot be reached at startup the registry runs
//! in an explicitly observable degraded mode: every call fails with
//! `RegistryError::Unavailable` but connections are still accepted.

use std::collections::HashMap;

use async_trait::async_trait;
use proto::{ConnectionDescriptor, ConnectionId, RegistryError, TenantId};
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{error, info};

use crate::store::{ConnectionRegistry, tenant_key};

/// Registry over a shared long-lived Redis connection manager.
pub struct RedisRegistry {
    manager: Option<ConnectionManager>,
}

impl RedisRegistry {
    /// Connects to the store once at startup.
    ///
    /// Never fails: a connection or store-level authentication failure is
    /// logged and the registry enters degraded mode.
    pub async fn connect(url: &str) -> Self {
        let manager = match Client::open(url) {
            Ok(client) => match client.get_connection_manager().await {
                Ok(manager) => {
                    info!("Connected to registry store");
                    Some(manager)
                }
                Err(e) => {
                    error!("Registry store connection failed, running degraded: {e}");
                    None
                }
            },
            Err(e) => {
                error!("Invalid registry store URL, running degraded: {e}");
                None
            }
        };
        Self { manager }
    }

    /// Returns `true` when the store was unreachable at startup and
    /// registry calls will fail until the process restarts.
    pub fn is_degraded(&self) -> bool {
        self.manager.is_none()
    }

    fn connection(&self) -> Result<ConnectionManager, RegistryError> {
        self.manager
            .clone()
            .ok_or_else(|| RegistryError::Unavailable("store connection not established".into()))
    }
}

#[async_trait]
impl ConnectionRegistry for RedisRegistry {
    async fn register(
        &self,
        tenant: &TenantId,
        connection_id: &ConnectionId,
        descriptor: &ConnectionDescriptor,
    ) -> Result<(), RegistryError> {
        let mut conn = self.connection()?;
        let value = serde_json::to_string(descriptor)
            .map_err(|e| RegistryError::Encoding(e.to_string()))?;
        let _: () = conn
            .hset(tenant_key(tenant), connection_id.as_str(), value)
            .await
            .map_err(|e| RegistryError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn unregister(
        &self,
        tenant: &TenantId,
        connection_id: &ConnectionId,
    ) -> Result<(), RegistryError> {
        let mut conn = self.connection()?;
        // HDEL of an absent field returns 0; both outcomes are success.
        let _: usize = conn
            .hdel(tenant_key(tenant), connection_id.as_str())
            .await
            .map_err(|e| RegistryError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn list_connections(
        &self,
        tenant: &TenantId,
    ) -> Result<HashMap<ConnectionId, ConnectionDescriptor>, RegistryError> {
        let mut conn = self.connection()?;
        let raw: HashMap<String, String> = conn
            .hgetall(tenant_key(tenant))
            .await
            .map_err(|e| RegistryError::Unavailable(e.to_string()))?;

        let mut connections = HashMap::with_capacity(raw.len());
        for (field, value) in raw {
            let descriptor: ConnectionDescriptor = serde_json::from_str(&value)
                .map_err(|e| RegistryError::Encoding(e.to_string()))?;
            connections.insert(ConnectionId::from(field), descriptor);
        }
        Ok(connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn degraded_registry() -> RedisRegistry {
        RedisRegistry { manager: None }
    }

    #[tokio::test]
    async fn degraded_registry_reports_unavailable_on_register() {
        let registry = degraded_registry();
        assert!(registry.is_degraded());

        let tenant = TenantId::from("acme");
        let connection_id = ConnectionId::from("c1");
        let descriptor = ConnectionDescriptor::new(connection_id.clone());

        let err = registry
            .register(&tenant, &connection_id, &descriptor)
            .await
            .expect_err("degraded registry should fail");
        assert!(matches!(err, RegistryError::Unavailable(_)));
    }

    #[tokio::test]
    async fn degraded_registry_reports_unavailable_on_list() {
        let registry = degraded_registry();
        let err = registry
            .list_connections(&TenantId::from("acme"))
            .await
            .expect_err("degraded registry should fail");
        assert!(matches!(err, RegistryError::Unavailable(_)));
    }

    #[tokio::test]
    async fn connect_with_unreachable_store_enters_degraded_mode() {
        // Port 1 is never a Redis server; connection manager setup fails fast.
        let registry = RedisRegistry::connect("redis://127.0.0.1:1").await;
        assert!(registry.is_degraded());
    }

    #[tokio::test]
    async fn connect_with_invalid_url_enters_degraded_mode() {
        let registry = RedisRegistry::connect("not-a-url").await;
        assert!(registry.is_degraded());
    }
}
