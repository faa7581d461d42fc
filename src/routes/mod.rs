//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the per-session websocket endpoint and the save/load endpoints
//! under a single Axum router. Connections arrive already authorized by an
//! upstream gate; nothing here checks identity.

pub mod lessons;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws/{session_id}", get(ws::handle_ws))
        .route("/save-lesson/{session_id}", post(lessons::save_lesson))
        .route("/load-lesson/{session_id}", get(lessons::load_lesson))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
