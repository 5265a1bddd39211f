use serde::{Deserialize, Serialize};

use crate::ident::ConnectionId;

/// Serialized record for one live connection, stored in the per-tenant
/// registry collection keyed by connection identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    /// Connection this descriptor belongs to.
    pub connection_id: ConnectionId,
    /// Arbitrary metadata attached at registration time.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl ConnectionDescriptor {
    /// Creates a descriptor with no metadata.
    pub fn new(connection_id: ConnectionId) -> Self {
        Self {
            connection_id,
            metadata: serde_json::Value::Null,
        }
    }

    /// Creates a descriptor carrying metadata.
    pub fn with_metadata(connection_id: ConnectionId, metadata: serde_json::Value) -> Self {
        Self {
            connection_id,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_round_trips_through_json() {
        let descriptor = ConnectionDescriptor::with_metadata(
            ConnectionId::from("c1"),
            serde_json::json!({"agent": "web"}),
        );
        let json = serde_json::to_string(&descriptor).expect("serialize");
        let parsed: ConnectionDescriptor = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, descriptor);
    }

    #[test]
    fn descriptor_without_metadata_defaults_to_null() {
        let parsed: ConnectionDescriptor =
            serde_json::from_str(r#"{"connection_id":"c1"}"#).expect("deserialize");
        assert_eq!(parsed.connection_id.as_str(), "c1");
        assert_eq!(parsed.metadata, serde_json::Value::Null);
    }
}
