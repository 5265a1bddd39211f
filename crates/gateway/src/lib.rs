//! Gateway components: credential verification, session lifecycle, event
//! routing, and the WebSocket server.

pub mod auth;
pub mod router;
pub mod server;
pub mod session;

/// Bearer-token verifier used at handshake time.
pub use auth::TokenVerifier;
/// Room-scoped event router.
pub use router::EventRouter;
/// WebSocket server and connection lifecycle helpers.
pub use server::{ConnectParams, Gateway, GatewayState};
/// Per-connection session state machine.
pub use session::{Session, SessionState};
