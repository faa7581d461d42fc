//! Session hub: authoritative state and fan-out for one whiteboard session.
//!
//! DESIGN
//! ======
//! A hub owns the session's `SessionState` and its attached connections
//! behind one async mutex. Every mutation and the snapshot broadcast that
//! follows it happen under that lock, so each connection receives snapshots
//! in exactly the order the mutations were applied.
//!
//! Connections are bounded `mpsc` queues drained by the client's websocket
//! task. Broadcast uses `try_send`, so a slow client never stalls the
//! others: a full or closed queue counts as a failed send and the
//! connection is detached once the pass completes.
//!
//! LIFECYCLE
//! =========
//! 1. `attach` → connection registered, snapshot queued to it alone
//! 2. `apply_upsert` / `apply_delete` → state mutated, snapshot to all
//! 3. `detach` → connection removed (idempotent)

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::message::ServerMessage;
use crate::state::{Element, SessionState};

// =============================================================================
// CONNECTION HANDLE
// =============================================================================

/// Outbound message as queued to a client. Shared so one snapshot is not
/// cloned per recipient.
pub type Outbound = Arc<ServerMessage>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("outbound queue full")]
    Full,
    #[error("connection closed")]
    Closed,
}

/// Sending half of one client's outbound queue.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: Uuid,
    tx: mpsc::Sender<Outbound>,
}

impl ConnectionHandle {
    /// Create a handle plus the receiver its websocket task drains.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { id: Uuid::new_v4(), tx }, rx)
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Queue a message without waiting.
    ///
    /// # Errors
    ///
    /// `Full` when the client is not keeping up, `Closed` when its task is gone.
    pub fn send(&self, message: Outbound) -> Result<(), SendError> {
        self.tx.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }
}

// =============================================================================
// SESSION HUB
// =============================================================================

struct HubInner {
    state: SessionState,
    connections: HashMap<Uuid, ConnectionHandle>,
}

pub struct SessionHub {
    session_id: i64,
    inner: Mutex<HubInner>,
}

impl SessionHub {
    #[must_use]
    pub fn new(session_id: i64) -> Self {
        Self::with_state(session_id, SessionState::new())
    }

    #[must_use]
    pub fn with_state(session_id: i64, state: SessionState) -> Self {
        Self { session_id, inner: Mutex::new(HubInner { state, connections: HashMap::new() }) }
    }

    #[must_use]
    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    /// Register a connection and queue the current snapshot to it.
    ///
    /// Callers guarantee a handle is attached at most once.
    pub async fn attach(&self, conn: ConnectionHandle) {
        let mut inner = self.inner.lock().await;
        let conn_id = conn.id();
        let snapshot = Arc::new(ServerMessage::snapshot(inner.state.all_elements()));

        if let Err(e) = conn.send(snapshot) {
            warn!(session_id = self.session_id, %conn_id, error = %e, "hub: initial snapshot failed; not attaching");
            return;
        }
        inner.connections.insert(conn_id, conn);
        info!(
            session_id = self.session_id,
            %conn_id,
            connections = inner.connections.len(),
            elements = inner.state.len(),
            "hub: connection attached"
        );
    }

    /// Remove a connection. Returns false if it was already gone.
    pub async fn detach(&self, conn_id: Uuid) -> bool {
        let mut inner = self.inner.lock().await;
        let removed = inner.connections.remove(&conn_id).is_some();
        if removed {
            info!(session_id = self.session_id, %conn_id, remaining = inner.connections.len(), "hub: connection detached");
        }
        removed
    }

    /// Insert or replace an element, then broadcast the full snapshot.
    pub async fn apply_upsert(&self, element: Element) {
        let mut inner = self.inner.lock().await;
        let element_id = element.id;
        let replaced = inner.state.upsert(element).is_some();
        debug!(session_id = self.session_id, element_id, replaced, "hub: upsert");
        self.broadcast_snapshot(&mut inner);
    }

    /// Delete an element if present, then broadcast the full snapshot.
    pub async fn apply_delete(&self, element_id: i64) {
        let mut inner = self.inner.lock().await;
        let removed = inner.state.delete(element_id).is_some();
        debug!(session_id = self.session_id, element_id, removed, "hub: delete");
        self.broadcast_snapshot(&mut inner);
    }

    /// Replace the whole state (load path), then broadcast the snapshot.
    pub async fn replace_all(&self, elements: Vec<Element>) {
        let mut inner = self.inner.lock().await;
        inner.state.replace_all(elements);
        info!(session_id = self.session_id, elements = inner.state.len(), "hub: state replaced");
        self.broadcast_snapshot(&mut inner);
    }

    /// Send a message to every attached connection.
    #[cfg_attr(not(test), allow(dead_code))]
    pub async fn broadcast(&self, message: ServerMessage) {
        let mut inner = self.inner.lock().await;
        self.broadcast_locked(&mut inner, &Arc::new(message));
    }

    pub async fn elements(&self) -> Vec<Element> {
        self.inner.lock().await.state.all_elements()
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.lock().await.connections.len()
    }

    fn broadcast_snapshot(&self, inner: &mut HubInner) {
        let snapshot = Arc::new(ServerMessage::snapshot(inner.state.all_elements()));
        self.broadcast_locked(inner, &snapshot);
    }

    fn broadcast_locked(&self, inner: &mut HubInner, message: &Outbound) {
        let mut failed = Vec::new();
        for (conn_id, conn) in &inner.connections {
            if let Err(e) = conn.send(Arc::clone(message)) {
                failed.push((*conn_id, e));
            }
        }

        // Removals only after the pass; never mutate the set mid-iteration.
        for (conn_id, e) in failed {
            inner.connections.remove(&conn_id);
            warn!(session_id = self.session_id, %conn_id, error = %e, "hub: send failed; connection detached");
        }
    }
}

#[cfg(test)]
#[path = "hub_test.rs"]
mod tests;
