//! Session registry: process-wide directory of live hubs.
//!
//! DESIGN
//! ======
//! The registry is created once in `main` and carried in `AppState`. The
//! map lock is held only to find or insert a hub, never while a hub does
//! work, so different sessions proceed fully in parallel. Creation happens
//! under the write lock with `entry`, so racing callers for one id always
//! end up sharing a single hub.
//!
//! Hubs are kept for the process lifetime; there is no idle eviction.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::services::hub::SessionHub;
use crate::state::{Element, SessionState};

#[derive(Clone, Default)]
pub struct SessionRegistry {
    hubs: Arc<RwLock<HashMap<i64, Arc<SessionHub>>>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-creating lookup.
    pub async fn get(&self, session_id: i64) -> Option<Arc<SessionHub>> {
        self.hubs.read().await.get(&session_id).cloned()
    }

    /// Return the live hub for `session_id`, creating an empty one if needed.
    pub async fn get_or_create(&self, session_id: i64) -> Arc<SessionHub> {
        if let Some(hub) = self.get(session_id).await {
            return hub;
        }

        let mut hubs = self.hubs.write().await;
        Arc::clone(hubs.entry(session_id).or_insert_with(|| {
            info!(session_id, "registry: created empty hub");
            Arc::new(SessionHub::new(session_id))
        }))
    }

    /// Load path: replace a live hub's state (broadcasting it) or create a
    /// hub pre-seeded with `elements`.
    pub async fn seed_or_replace(&self, session_id: i64, elements: Vec<Element>) -> Arc<SessionHub> {
        let existing = {
            let mut hubs = self.hubs.write().await;
            match hubs.entry(session_id) {
                Entry::Occupied(entry) => Arc::clone(entry.get()),
                Entry::Vacant(entry) => {
                    let count = elements.len();
                    let hub = Arc::new(SessionHub::with_state(session_id, SessionState::from_elements(elements)));
                    entry.insert(Arc::clone(&hub));
                    info!(session_id, elements = count, "registry: created seeded hub");
                    return hub;
                }
            }
        };

        // Registry lock released; only this session's hub is locked now.
        existing.replace_all(elements).await;
        existing
    }

    pub async fn len(&self) -> usize {
        self.hubs.read().await.len()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub async fn is_empty(&self) -> bool {
        self.hubs.read().await.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
