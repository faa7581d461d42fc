//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own session state, fan-out, and persistence so route
//! handlers can stay focused on protocol translation.

pub mod board;
pub mod hub;
pub mod persistence;
pub mod registry;
