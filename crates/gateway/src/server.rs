//! WebSocket server and connection lifecycle orchestration.
//!
//! The handshake gate runs before the upgrade: a missing token, failed
//! verification, or missing tenant refuses the connection with a
//! machine-readable reason code and no event is ever delivered to a
//! rejected client. Accepted connections get a `Session`, a best-effort
//! registry entry, and per-connection read/write tasks.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State, WebSocketUpgrade, ws},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use proto::{
    AuthError, ClientFrame, ConnectionDescriptor, ConnectionId, GatewayError, IdentityClaim,
    RoomId, RouterError, ServerFrame, TenantId,
};
use registry::ConnectionRegistry;
use serde::Deserialize;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use crate::auth::TokenVerifier;
use crate::router::EventRouter;
use crate::session::Session;

/// Outbound frame buffer per connection.
const FRAME_BUFFER: usize = 64;

/// Acknowledgment body for a master-data request.
const MASTER_DATA_MESSAGE: &str = "Master data updated";

// ─── Handshake ─────────────────────────────────────────────

/// Query parameters delivered with the WebSocket upgrade request.
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    /// Bearer token (`?token=...`).
    pub token: Option<String>,
    /// Tenant the connection claims (`?tenantId=...`).
    #[serde(rename = "tenantId")]
    pub tenant_id: Option<String>,
}

/// Handshake gate: verifies the token and validates the tenant ID.
///
/// The tenant is trusted only to scope registry bookkeeping and room
/// visibility; it is never an authorization grant.
pub fn authenticate_handshake(
    params: &ConnectParams,
    verifier: &TokenVerifier,
) -> Result<(IdentityClaim, TenantId), AuthError> {
    let token = params
        .token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or(AuthError::MissingToken)?;
    let identity = verifier.verify(token)?;
    let tenant = params
        .tenant_id
        .as_deref()
        .map(TenantId::from)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingTenant)?;
    Ok((identity, tenant))
}

fn reject_response(err: &AuthError) -> Response {
    let status = match err {
        AuthError::MissingToken => StatusCode::FORBIDDEN,
        AuthError::MissingTenant => StatusCode::BAD_REQUEST,
        AuthError::InvalidToken(_) | AuthError::ExpiredToken => StatusCode::UNAUTHORIZED,
    };
    (
        status,
        Json(serde_json::json!({ "error": err.reason_code() })),
    )
        .into_response()
}

// ─── Shared state ──────────────────────────────────────────

/// State shared by all connections: the verifier, the injected registry
/// capability, and the event router.
pub struct GatewayState {
    verifier: TokenVerifier,
    registry: Arc<dyn ConnectionRegistry>,
    router: Arc<EventRouter>,
}

impl GatewayState {
    /// Creates shared state around an injected registry handle.
    pub fn new(verifier: TokenVerifier, registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self {
            verifier,
            registry,
            router: Arc::new(EventRouter::new()),
        }
    }

    /// The event router, for server-initiated notification pushes.
    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// The connection registry capability.
    pub fn registry(&self) -> &dyn ConnectionRegistry {
        self.registry.as_ref()
    }
}

// ─── Gateway ───────────────────────────────────────────────

/// Realtime gateway server: orchestrates handshake, registry writes,
/// router wiring, and teardown.
pub struct Gateway {
    addr: SocketAddr,
    cors_origins: String,
    state: Arc<GatewayState>,
}

impl Gateway {
    /// Creates a gateway bound to `addr` once [`Gateway::run`] is called.
    pub fn new(addr: SocketAddr, cors_origins: String, state: Arc<GatewayState>) -> Self {
        Self {
            addr,
            cors_origins,
            state,
        }
    }

    /// Builds the axum application.
    pub fn app(&self) -> Router {
        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .with_state(self.state.clone())
            .layer(build_cors(&self.cors_origins))
    }

    /// Binds the listener and serves until ctrl-c.
    pub async fn run(self) -> Result<(), GatewayError> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{}: {e}", self.addr)))?;
        info!("Realtime gateway listening on {}", self.addr);

        axum::serve(listener, self.app())
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
            .map_err(|e| GatewayError::Connection(format!("server error: {e}")))?;

        info!("Realtime gateway stopped");
        Ok(())
    }
}

/// Builds the CORS layer from the configured origins string.
fn build_cors(cors_origins: &str) -> CorsLayer {
    if cors_origins == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

// ─── Axum handlers ─────────────────────────────────────────

/// Liveness endpoint.
async fn health_handler() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler; the handshake gate runs before the upgrade.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<Arc<GatewayState>>,
) -> Response {
    match authenticate_handshake(&params, &state.verifier) {
        Ok((identity, tenant)) => {
            ws.on_upgrade(move |socket| handle_connection(socket, identity, tenant, state))
        }
        Err(e) => {
            warn!(reason = e.reason_code(), "Handshake rejected: {e}");
            reject_response(&e)
        }
    }
}

/// Manages one accepted connection from activation to teardown.
async fn handle_connection(
    socket: ws::WebSocket,
    identity: IdentityClaim,
    tenant: TenantId,
    state: Arc<GatewayState>,
) {
    let (mut session, mut frame_rx) = open_session(&state, identity, tenant).await;
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Write task: router frames -> client.
    let write_task = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            let Ok(json) = serde_json::to_string(&frame) else {
                continue;
            };
            if ws_tx.send(ws::Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Read loop: events from a single session are processed in order.
    while let Some(Ok(msg)) = ws_rx.next().await {
        let ws::Message::Text(text) = msg else {
            continue;
        };
        dispatch_frame(&state, &mut session, &text).await;
    }

    close_session(&state, &mut session).await;
    write_task.abort();
}

// ─── Connection lifecycle ──────────────────────────────────

/// `Authenticated → Active`: creates the session, writes the registry
/// entry (best-effort — a store outage never blocks the connection), and
/// wires the session into the router.
pub async fn open_session(
    state: &GatewayState,
    identity: IdentityClaim,
    tenant: TenantId,
) -> (Session, mpsc::Receiver<ServerFrame>) {
    let connection_id = ConnectionId::new();
    let mut session = Session::new(connection_id.clone(), tenant.clone(), identity);
    info!(
        user = %session.identity().name,
        tenant = %tenant,
        connection = %connection_id,
        "Client connected"
    );

    let descriptor = ConnectionDescriptor::with_metadata(
        connection_id.clone(),
        serde_json::json!({ "subject": session.identity().subject }),
    );
    if let Err(e) = state
        .registry
        .register(&tenant, &connection_id, &descriptor)
        .await
    {
        warn!("Registry registration failed for {connection_id}: {e}");
    }
    session.activate();

    // Presence snapshot at connect time, observability only.
    match state.registry.list_connections(&tenant).await {
        Ok(connections) => {
            debug!(tenant = %tenant, count = connections.len(), "Tenant presence snapshot");
        }
        Err(e) => debug!("Presence snapshot unavailable: {e}"),
    }

    let (frame_tx, frame_rx) = mpsc::channel(FRAME_BUFFER);
    state
        .router
        .attach(connection_id, tenant, frame_tx);
    (session, frame_rx)
}

/// Dispatches one inbound text frame for a session.
///
/// A malformed frame is dropped with a warning and the connection stays
/// open; a single session's malfunction never affects others.
pub async fn dispatch_frame(state: &GatewayState, session: &mut Session, text: &str) {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            let err = RouterError::MalformedFrame(e.to_string());
            warn!(connection = %session.connection_id(), "Dropping frame: {err}");
            return;
        }
    };

    match frame {
        ClientFrame::Typing {
            conversation_id,
            is_typing,
        } => {
            if !session.is_active() {
                warn!(connection = %session.connection_id(), "Dropping frame: {}", RouterError::NotActive);
                return;
            }
            let room = RoomId::from(conversation_id);
            state
                .router
                .relay_typing(session.tenant(), &room, session.connection_id(), is_typing)
                .await;
        }
        ClientFrame::GetMasterData => {
            state
                .router
                .send_to(
                    session.connection_id(),
                    ServerFrame::MasterDataResponse {
                        message: MASTER_DATA_MESSAGE.to_string(),
                    },
                )
                .await;
        }
        ClientFrame::Join { conversation_id } => {
            let room = RoomId::from(conversation_id);
            match session.join_room(room.clone()) {
                Ok(()) => {
                    let connection_id = session.connection_id().clone();
                    state.router.join(session.tenant(), room, connection_id);
                }
                Err(e) => {
                    warn!(connection = %session.connection_id(), "Dropping frame: {e}");
                }
            }
        }
        ClientFrame::Leave { conversation_id } => {
            let room = RoomId::from(conversation_id);
            match session.leave_room(&room) {
                Ok(()) => {
                    state
                        .router
                        .leave(session.tenant(), &room, session.connection_id());
                }
                Err(e) => {
                    warn!(connection = %session.connection_id(), "Dropping frame: {e}");
                }
            }
        }
        ClientFrame::Ping => {
            state
                .router
                .send_to(session.connection_id(), ServerFrame::Pong)
                .await;
        }
    }
}

/// `Active → Closed`: detaches the router peer and removes the registry
/// entry exactly once. Safe under duplicate disconnect delivery.
pub async fn close_session(state: &GatewayState, session: &mut Session) {
    if !session.close() {
        return;
    }
    state.router.detach(session.connection_id());
    if let Err(e) = state
        .registry
        .unregister(session.tenant(), session.connection_id())
        .await
    {
        warn!(
            "Registry unregister failed for {}: {e}",
            session.connection_id()
        );
    }
    info!(connection = %session.connection_id(), "Client disconnected");
}
