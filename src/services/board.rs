//! Board service: save and load round trips between hubs and storage.
//!
//! DESIGN
//! ======
//! Save reads the live hub's elements and hands them to the persistence
//! store; a session without a live hub cannot be saved. Load reads the
//! stored elements and either replaces a live hub's state (broadcasting to
//! its clients) or seeds a fresh hub that clients will attach to later.

use tracing::{info, warn};

use crate::services::persistence::{PersistedBoard, PersistenceError};
use crate::state::{AppState, Element};

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("no live board for session {0}")]
    NoLiveSession(i64),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl BoardError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NoLiveSession(_) => true,
            Self::Persistence(e) => e.is_not_found(),
        }
    }
}

/// Persist the live state of `session_id`.
///
/// # Errors
///
/// `NoLiveSession` when no hub is running, otherwise any storage failure.
pub async fn save_session(state: &AppState, session_id: i64) -> Result<PersistedBoard, BoardError> {
    let Some(hub) = state.registry.get(session_id).await else {
        warn!(session_id, "board: save requested for session with no live hub");
        return Err(BoardError::NoLiveSession(session_id));
    };

    let elements = hub.elements().await;
    let saved = state.store.save(session_id, &elements).await?;
    info!(session_id, link = %saved.record.link, elements = saved.element_count, "board: session saved");
    Ok(saved)
}

/// Restore `session_id` from storage into its hub. Returns the loaded elements.
///
/// # Errors
///
/// Not-found when no record or state file exists, otherwise any storage failure.
pub async fn load_session(state: &AppState, session_id: i64) -> Result<Vec<Element>, BoardError> {
    let elements = state.store.load(session_id).await?;
    let hub = state.registry.seed_or_replace(session_id, elements.clone()).await;
    let connections = hub.connection_count().await;
    let hubs = state.registry.len().await;
    info!(session_id, elements = elements.len(), connections, hubs, "board: session loaded");
    Ok(elements)
}

#[cfg(test)]
#[path = "board_test.rs"]
mod tests;
