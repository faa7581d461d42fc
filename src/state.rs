//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the session registry (one live hub per whiteboard session),
//! the persistence store used by save/load, and the runtime config.
//! `SessionState` is the plain element map a hub owns; it does no locking
//! of its own.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::services::persistence::PersistenceStore;
use crate::services::registry::SessionRegistry;

// =============================================================================
// ELEMENT
// =============================================================================

/// One positioned block on the board. Ids are chosen by the client that
/// creates the block and are trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: i64,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
    #[serde(default)]
    pub content: String,
    pub content_type: String,
    #[serde(default)]
    pub content_url: String,
    #[serde(default = "default_page_number")]
    pub page_number: i64,
}

fn default_page_number() -> i64 {
    1
}

// =============================================================================
// SESSION STATE
// =============================================================================

/// Current elements of one session keyed by element id.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    elements: BTreeMap<i64, Element>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self { elements: BTreeMap::new() }
    }

    /// Build a state from a list of elements. Later duplicates win.
    #[must_use]
    pub fn from_elements(elements: Vec<Element>) -> Self {
        let mut state = Self::new();
        state.replace_all(elements);
        state
    }

    #[cfg_attr(not(test), allow(dead_code))]
    #[must_use]
    pub fn get(&self, id: i64) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// Insert or wholesale-replace by id. Returns the replaced element.
    pub fn upsert(&mut self, element: Element) -> Option<Element> {
        self.elements.insert(element.id, element)
    }

    /// Remove by id. Absent ids are a no-op.
    pub fn delete(&mut self, id: i64) -> Option<Element> {
        self.elements.remove(&id)
    }

    /// Every element, ordered by id.
    #[must_use]
    pub fn all_elements(&self) -> Vec<Element> {
        self.elements.values().cloned().collect()
    }

    pub fn replace_all(&mut self, elements: Vec<Element>) {
        self.elements = elements.into_iter().map(|el| (el.id, el)).collect();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub registry: SessionRegistry,
    pub store: Arc<dyn PersistenceStore>,
    pub config: Arc<Config>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn PersistenceStore>, config: Config) -> Self {
        Self { registry: SessionRegistry::new(), store, config: Arc::new(config) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
