//! Log archive routes
//!
//! Download of single archived logs, the JSON listing and the device state.

use crate::api::AppState;
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use super::body::stream_response;
use super::error::AppError;
use super::types::StateResponse;

// ============================================================================
// ROUTES
// ============================================================================

pub fn log_routes() -> Router<AppState> {
    Router::new()
        .route("/logs/:name", get(download_log))
        .route("/api/logs", get(list_logs))
        .route("/api/state", get(device_state))
}

// ============================================================================
// HANDLERS
// ============================================================================

async fn download_log(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    tracing::debug!("Download request for log {}", name);

    let guard = state.device_lock.clone().lock_owned().await;
    let session = state.archive.serve_entry(&name, true)?;
    stream_response(session, state.config.stream_chunk_size, guard)
}

async fn list_logs(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let json = {
        let _guard = state.device_lock.lock().await;
        state.archive.render_json()?
    };
    Ok(([(header::CONTENT_TYPE, "application/json")], json))
}

async fn device_state(State(state): State<AppState>) -> Json<StateResponse> {
    let _guard = state.device_lock.lock().await;
    let mounted = state.storage.is_mounted();
    Json(StateResponse {
        server: state.config.server_name.clone(),
        storage: if mounted { "ok" } else { "missing" },
        archive: mounted && state.storage.exists(state.archive.archive_dir()),
    })
}
