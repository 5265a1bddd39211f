//! Per-connection session state machine.
//!
//! A session is constructed only after the verifier succeeds (the
//! `Authenticated` state); rejected handshakes never produce one. It is
//! owned by the gateway for the duration of one physical connection and
//! destroyed exactly once on disconnect.

use std::collections::HashSet;

use proto::{ConnectionId, IdentityClaim, RoomId, RouterError, TenantId};

/// Lifecycle states of an accepted connection.
///
/// `Connecting → Authenticating → Authenticated → Active → Closed`, with
/// a terminal `Rejected` reachable from `Authenticating`. The first three
/// states live in the handshake path; a `Session` value starts at
/// `Authenticated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport established, handshake payload not yet examined.
    Connecting,
    /// Token and tenant extracted, verification in progress.
    Authenticating,
    /// Verifier succeeded; identity claim attached.
    Authenticated,
    /// Registered (best-effort) and eligible to send/receive events.
    Active,
    /// Handshake refused; terminal.
    Rejected,
    /// Torn down; terminal and idempotent.
    Closed,
}

/// An accepted connection bound to a verified identity and a tenant.
pub struct Session {
    connection_id: ConnectionId,
    tenant: TenantId,
    identity: IdentityClaim,
    rooms: HashSet<RoomId>,
    state: SessionState,
}

impl Session {
    /// Creates a session in the `Authenticated` state.
    ///
    /// The tenant binding is permanent: reconnecting is the only way to
    /// change tenant.
    pub fn new(connection_id: ConnectionId, tenant: TenantId, identity: IdentityClaim) -> Self {
        Self {
            connection_id,
            tenant,
            identity,
            rooms: HashSet::new(),
            state: SessionState::Authenticated,
        }
    }

    /// Connection identifier, unique per live connection.
    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    /// Tenant this session is registered under.
    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// Identity claim attached at handshake time; immutable thereafter.
    pub fn identity(&self) -> &IdentityClaim {
        &self.identity
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Rooms the session has joined.
    pub fn rooms(&self) -> impl Iterator<Item = &RoomId> {
        self.rooms.iter()
    }

    /// Returns `true` once the session may send/receive events.
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// `Authenticated → Active`: the session becomes eligible for events.
    /// Registry failure does not prevent activation, so this transition is
    /// unconditional from `Authenticated`.
    pub fn activate(&mut self) {
        if self.state == SessionState::Authenticated {
            self.state = SessionState::Active;
        }
    }

    /// Joins a room; rejected before `Active`.
    pub fn join_room(&mut self, room: RoomId) -> Result<(), RouterError> {
        if !self.is_active() {
            return Err(RouterError::NotActive);
        }
        self.rooms.insert(room);
        Ok(())
    }

    /// Leaves a room; rejected before `Active`. Leaving a room the session
    /// never joined is a no-op.
    pub fn leave_room(&mut self, room: &RoomId) -> Result<(), RouterError> {
        if !self.is_active() {
            return Err(RouterError::NotActive);
        }
        self.rooms.remove(room);
        Ok(())
    }

    /// `Active → Closed` (or from any non-terminal state on early
    /// disconnect). Returns `true` only on the first call so teardown side
    /// effects run exactly once; room memberships are released.
    pub fn close(&mut self) -> bool {
        if self.state == SessionState::Closed {
            return false;
        }
        self.state = SessionState::Closed;
        self.rooms.clear();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(
            ConnectionId::from("c1"),
            TenantId::from("acme"),
            IdentityClaim::new("user-1", "Alice"),
        )
    }

    #[test]
    fn new_session_starts_authenticated() {
        let session = session();
        assert_eq!(session.state(), SessionState::Authenticated);
        assert!(!session.is_active());
    }

    #[test]
    fn activate_moves_to_active_once() {
        let mut session = session();
        session.activate();
        assert!(session.is_active());

        // Repeated activation stays in Active.
        session.activate();
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn room_operations_are_rejected_before_active() {
        let mut session = session();
        let err = session
            .join_room(RoomId::from("conv-1"))
            .expect_err("join before active");
        assert!(matches!(err, RouterError::NotActive));

        let err = session
            .leave_room(&RoomId::from("conv-1"))
            .expect_err("leave before active");
        assert!(matches!(err, RouterError::NotActive));
    }

    #[test]
    fn join_and_leave_track_room_membership() {
        let mut session = session();
        session.activate();

        session.join_room(RoomId::from("conv-1")).expect("join");
        session.join_room(RoomId::from("conv-2")).expect("join");
        assert_eq!(session.rooms().count(), 2);

        session.leave_room(&RoomId::from("conv-1")).expect("leave");
        assert_eq!(session.rooms().count(), 1);

        // Leaving an unjoined room is a no-op.
        session.leave_room(&RoomId::from("conv-9")).expect("leave");
        assert_eq!(session.rooms().count(), 1);
    }

    #[test]
    fn close_is_idempotent_and_releases_rooms() {
        let mut session = session();
        session.activate();
        session.join_room(RoomId::from("conv-1")).expect("join");

        assert!(session.close(), "first close runs teardown");
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.rooms().count(), 0);

        assert!(!session.close(), "second close is a no-op");
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn close_before_active_still_reaches_closed() {
        let mut session = session();
        assert!(session.close());
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn activation_after_close_does_nothing() {
        let mut session = session();
        session.close();
        session.activate();
        assert_eq!(session.state(), SessionState::Closed);
    }
}
