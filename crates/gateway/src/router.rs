//! Room-scoped event routing.
//!
//! Each connected session is attached as a peer with an outbound frame
//! sender; room membership is tracked per (tenant, room) so rooms are
//! implicitly partitioned by tenant. Delivery is best-effort: a peer that
//! cannot be reached is skipped with a warning, never an error.

use std::collections::HashSet;

use dashmap::DashMap;
use proto::{ConnectionId, RoomId, ServerFrame, TenantId};
use tokio::sync::mpsc;
use tracing::{debug, warn};

struct Peer {
    tenant: TenantId,
    tx: mpsc::Sender<ServerFrame>,
}

/// Dispatches inbound events to room-scoped broadcast or targeted
/// handlers, and pushes server-initiated notifications.
#[derive(Default)]
pub struct EventRouter {
    /// connection_id -> outbound frame sender + tenant
    peers: DashMap<ConnectionId, Peer>,
    /// (tenant, room) -> joined connection ids
    rooms: DashMap<(TenantId, RoomId), HashSet<ConnectionId>>,
}

impl EventRouter {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a session's outbound sender.
    pub fn attach(
        &self,
        connection_id: ConnectionId,
        tenant: TenantId,
        tx: mpsc::Sender<ServerFrame>,
    ) {
        debug!("Attaching peer: {connection_id}");
        self.peers.insert(connection_id, Peer { tenant, tx });
    }

    /// Detach a session and purge it from every room it joined.
    pub fn detach(&self, connection_id: &ConnectionId) {
        debug!("Detaching peer: {connection_id}");
        self.peers.remove(connection_id);
        self.rooms.retain(|_, members| {
            members.remove(connection_id);
            !members.is_empty()
        });
    }

    /// Join a room within the session's tenant.
    pub fn join(&self, tenant: &TenantId, room: RoomId, connection_id: ConnectionId) {
        self.rooms
            .entry((tenant.clone(), room))
            .or_default()
            .insert(connection_id);
    }

    /// Leave a room; absence is a no-op.
    pub fn leave(&self, tenant: &TenantId, room: &RoomId, connection_id: &ConnectionId) {
        let key = (tenant.clone(), room.clone());
        if let Some(mut members) = self.rooms.get_mut(&key) {
            members.remove(connection_id);
        }
        self.rooms.remove_if(&key, |_, members| members.is_empty());
    }

    /// Relays a typing-state change to every other member of the room,
    /// excluding the sender.
    pub async fn relay_typing(
        &self,
        tenant: &TenantId,
        room: &RoomId,
        sender: &ConnectionId,
        is_typing: bool,
    ) {
        let targets = self.room_members(tenant, room, Some(sender));
        for target in targets {
            self.send_to(&target, ServerFrame::Typing { is_typing }).await;
        }
    }

    /// Sends a frame to one connection. Returns `false` when the peer is
    /// gone or its channel is closed; delivery is best-effort.
    pub async fn send_to(&self, connection_id: &ConnectionId, frame: ServerFrame) -> bool {
        let tx = self.peers.get(connection_id).map(|peer| peer.tx.clone());
        match tx {
            Some(tx) => match tx.send(frame).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to deliver frame to {connection_id}: {e}");
                    false
                }
            },
            None => {
                debug!("No peer attached for: {connection_id}");
                false
            }
        }
    }

    /// Pushes a server-initiated notification to every session joined to
    /// the room. A silent no-op when the room has no members.
    pub async fn notify_room(&self, tenant: &TenantId, room: &RoomId, payload: serde_json::Value) {
        let targets = self.room_members(tenant, room, None);
        for target in targets {
            self.send_to(
                &target,
                ServerFrame::Notification {
                    payload: payload.clone(),
                },
            )
            .await;
        }
    }

    /// Pushes a server-initiated notification to every connected session
    /// of the tenant. A silent no-op when none are connected.
    pub async fn notify_tenant(&self, tenant: &TenantId, payload: serde_json::Value) {
        let targets: Vec<ConnectionId> = self
            .peers
            .iter()
            .filter(|entry| &entry.value().tenant == tenant)
            .map(|entry| entry.key().clone())
            .collect();
        for target in targets {
            self.send_to(
                &target,
                ServerFrame::Notification {
                    payload: payload.clone(),
                },
            )
            .await;
        }
    }

    /// Number of attached peers.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    // Collect members up front so no map guard is held across an await.
    fn room_members(
        &self,
        tenant: &TenantId,
        room: &RoomId,
        exclude: Option<&ConnectionId>,
    ) -> Vec<ConnectionId> {
        match self.rooms.get(&(tenant.clone(), room.clone())) {
            Some(members) => members
                .iter()
                .filter(|member| exclude != Some(member))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }
}
