//! Wire frames exchanged over an established realtime connection.
//!
//! Frames are JSON text messages with a `type` tag. The inbound set is
//! closed so the router can dispatch exhaustively.

use serde::{Deserialize, Serialize};

/// Inbound frame from a connected client to the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientFrame {
    /// Typing-state change, relayed to the other members of the room.
    #[serde(rename_all = "camelCase")]
    Typing {
        conversation_id: String,
        is_typing: bool,
    },
    /// Request/acknowledge: the sender receives a single targeted response.
    GetMasterData,
    /// Join a room; prerequisite for receiving room-scoped events.
    #[serde(rename_all = "camelCase")]
    Join { conversation_id: String },
    /// Leave a previously joined room.
    #[serde(rename_all = "camelCase")]
    Leave { conversation_id: String },
    /// Heartbeat ping.
    Ping,
}

/// Outbound frame from the gateway to a connected client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerFrame {
    /// Typing-state change from another member of the room.
    #[serde(rename_all = "camelCase")]
    Typing { is_typing: bool },
    /// Targeted acknowledgment for a master-data request.
    MasterDataResponse { message: String },
    /// Server-initiated notification pushed to a room or tenant scope.
    Notification { payload: serde_json::Value },
    /// Heartbeat pong.
    Pong,
}
