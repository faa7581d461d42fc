//! WebSocket handler: one task per whiteboard client.
//!
//! DESIGN
//! ======
//! On upgrade the client is attached to its session's hub (created on first
//! touch) and the task enters a `select!` loop:
//! - Incoming client messages → parse + apply to the hub
//! - Snapshots queued by the hub → write to the socket
//!
//! The hub never writes to sockets itself; it only fills this task's
//! bounded queue. Socket writes are bounded by the configured send timeout
//! so a stalled client ends its own connection instead of backing up the
//! session.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → attach → snapshot queued
//! 2. Client edits → hub mutation → snapshot to every attached client
//! 3. Close / transport error / send failure / hub drops us → detach once

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::message::{self, Command, ServerMessage};
use crate::services::hub::{ConnectionHandle, SessionHub};
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state, session_id))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, session_id: i64) {
    let (conn, mut outbound) = ConnectionHandle::channel(state.config.client_queue_capacity);
    let conn_id = conn.id();
    let send_timeout = state.config.send_timeout;

    let hub = state.registry.get_or_create(session_id).await;
    hub.attach(conn).await;
    info!(%conn_id, session_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => process_inbound_text(&hub, conn_id, &text).await,
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            queued = outbound.recv() => {
                // None: the hub dropped our handle after a failed send.
                let Some(message) = queued else {
                    warn!(%conn_id, session_id, "ws: detached by hub");
                    break;
                };
                if send_message(&mut socket, &message, send_timeout).await.is_err() {
                    break;
                }
            }
        }
    }

    hub.detach(conn_id).await;
    info!(%conn_id, session_id, "ws: client disconnected");
}

// =============================================================================
// INBOUND
// =============================================================================

/// Parse one inbound text message and apply it. Invalid messages are
/// logged and dropped; the connection stays open.
async fn process_inbound_text(hub: &SessionHub, conn_id: Uuid, text: &str) {
    match message::parse_client_message(text) {
        Ok(Command::Upsert { action, element }) => {
            debug!(%conn_id, session_id = hub.session_id(), action = action.as_str(), element_id = element.id, "ws: recv edit");
            hub.apply_upsert(element).await;
        }
        Ok(Command::Delete { id }) => {
            debug!(%conn_id, session_id = hub.session_id(), element_id = id, "ws: recv delete");
            hub.apply_delete(id).await;
        }
        Err(e) => {
            warn!(%conn_id, session_id = hub.session_id(), error = %e, "ws: dropped inbound message");
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_message(socket: &mut WebSocket, message: &ServerMessage, send_timeout: Duration) -> Result<(), ()> {
    let json = match serde_json::to_string(message) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize message");
            return Err(());
        }
    };

    match tokio::time::timeout(send_timeout, socket.send(Message::Text(json.into()))).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            debug!(error = %e, "ws: send failed");
            Err(())
        }
        Err(_) => {
            warn!(timeout = ?send_timeout, "ws: send timed out");
            Err(())
        }
    }
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
