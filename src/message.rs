//! Wire messages for the whiteboard websocket.
//!
//! ARCHITECTURE
//! ============
//! Clients send `{"type": <action>, "data": <payload>}` envelopes. Every
//! accepted edit is answered with a full-state `update_blocks` snapshot
//! broadcast to the whole session. There are no acks, ids, or replies: a
//! message that fails validation is simply dropped by the caller.
//!
//! DESIGN
//! ======
//! Parsing is two-step. The envelope is decoded loosely so the action can be
//! checked against the fixed action set before the payload is validated
//! against the `Element` shape. `parse_client_message` is pure and returns a
//! typed `ProtocolError` for the websocket layer to log.

use serde::{Deserialize, Serialize};

use crate::state::Element;

// =============================================================================
// TYPES
// =============================================================================

/// Server → client message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full snapshot of every element in the session.
    UpdateBlocks { blocks: Vec<Element> },
}

impl ServerMessage {
    #[must_use]
    pub fn snapshot(blocks: Vec<Element>) -> Self {
        Self::UpdateBlocks { blocks }
    }
}

/// Declared action of an inbound envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AddBlock,
    MoveBlock,
    ResizeBlock,
    UpdateContent,
    UpdatePageNumber,
    DeleteBlock,
}

impl Action {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add_block" => Some(Self::AddBlock),
            "move_block" => Some(Self::MoveBlock),
            "resize_block" => Some(Self::ResizeBlock),
            "update_content" => Some(Self::UpdateContent),
            "update_page_number" => Some(Self::UpdatePageNumber),
            "delete_block" => Some(Self::DeleteBlock),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddBlock => "add_block",
            Self::MoveBlock => "move_block",
            Self::ResizeBlock => "resize_block",
            Self::UpdateContent => "update_content",
            Self::UpdatePageNumber => "update_page_number",
            Self::DeleteBlock => "delete_block",
        }
    }
}

/// A validated inbound edit, ready to apply to a hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upsert { action: Action, element: Element },
    Delete { id: i64 },
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid json: {0}")]
    InvalidJson(serde_json::Error),
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("{0}: missing data")]
    MissingData(&'static str),
    #[error("{action}: invalid element: {source}")]
    InvalidElement {
        action: &'static str,
        source: serde_json::Error,
    },
    #[error("delete_block: invalid payload: {0}")]
    InvalidDelete(serde_json::Error),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct DeletePayload {
    id: i64,
}

// =============================================================================
// PARSING
// =============================================================================

/// Parse and validate one inbound text message.
///
/// # Errors
///
/// Returns a `ProtocolError` describing why the message must be dropped.
pub fn parse_client_message(text: &str) -> Result<Command, ProtocolError> {
    let envelope: Envelope = serde_json::from_str(text).map_err(ProtocolError::InvalidJson)?;

    let Some(action) = Action::parse(&envelope.kind) else {
        return Err(ProtocolError::UnknownAction(envelope.kind));
    };

    // EDGE: `null`, `{}`, and absent data are all treated as missing.
    let data = match envelope.data {
        None | Some(serde_json::Value::Null) => return Err(ProtocolError::MissingData(action.as_str())),
        Some(serde_json::Value::Object(map)) if map.is_empty() => {
            return Err(ProtocolError::MissingData(action.as_str()));
        }
        Some(value) => value,
    };

    // Derived Deserialize also accepts positional arrays; payloads are objects only.
    let data = if data.is_object() { Ok(data) } else { Err(not_an_object(&data)) };

    if action == Action::DeleteBlock {
        let payload: DeletePayload = data
            .and_then(serde_json::from_value)
            .map_err(ProtocolError::InvalidDelete)?;
        return Ok(Command::Delete { id: payload.id });
    }

    let element: Element = data
        .and_then(serde_json::from_value)
        .map_err(|source| ProtocolError::InvalidElement { action: action.as_str(), source })?;
    Ok(Command::Upsert { action, element })
}

fn not_an_object(data: &serde_json::Value) -> serde_json::Error {
    let kind = if data.is_array() { "array" } else { "scalar" };
    serde::de::Error::custom(format!("expected an object, found {kind}"))
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
