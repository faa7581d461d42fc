//! Save/load endpoints for lesson boards.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::services::board::{self, BoardError};
use crate::state::AppState;

impl IntoResponse for BoardError {
    fn into_response(self) -> Response {
        let status = board_error_to_status(&self);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "board storage failure");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

pub(crate) fn board_error_to_status(err: &BoardError) -> StatusCode {
    if err.is_not_found() { StatusCode::NOT_FOUND } else { StatusCode::INTERNAL_SERVER_ERROR }
}

/// `POST /save-lesson/:id`: persist the live board of a session.
pub async fn save_lesson(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> Result<Json<serde_json::Value>, BoardError> {
    let saved = board::save_session(&state, session_id).await?;
    Ok(Json(json!({
        "message": "Lesson state saved successfully",
        "title": saved.record.title,
        "link": saved.record.link,
        "blocks": saved.element_count,
    })))
}

/// `GET /load-lesson/:id`: restore a saved board into its session.
pub async fn load_lesson(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> Result<Json<serde_json::Value>, BoardError> {
    let blocks = board::load_session(&state, session_id).await?;
    Ok(Json(json!({
        "message": "Lesson state loaded successfully",
        "blocks": blocks,
    })))
}

#[cfg(test)]
#[path = "lessons_test.rs"]
mod tests;
