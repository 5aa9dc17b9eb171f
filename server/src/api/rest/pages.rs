//! Web UI routes
//!
//! The index page with the log table filled in, and static assets served
//! from the card with gzip-variant fallback.

use crate::api::AppState;
use crate::archive::{ArchiveError, FileStreamResponse};
use crate::storage::join_path;
use axum::{
    extract::{Path, State},
    response::{Html, Response},
    routing::get,
    Router,
};

use super::body::{read_to_end, stream_response};
use super::error::AppError;

const LOG_TABLE_SLOT: &str = "%LOG_TABLE%";

const DEFAULT_INDEX: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Logger</title></head>
<body>
<h1>Logs</h1>
%LOG_TABLE%
</body>
</html>
"#;

pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index_page))
        .route("/static/*path", get(static_file))
}

async fn index_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let _guard = state.device_lock.lock().await;

    let template = load_template(&state)?;
    let page = if template.contains(LOG_TABLE_SLOT) {
        template.replace(LOG_TABLE_SLOT, &state.archive.render_html_table())
    } else {
        template
    };
    Ok(Html(page))
}

/// `index.html` from the web directory, or the built-in page when the card
/// has none.
fn load_template(state: &AppState) -> Result<String, AppError> {
    let path = join_path(&state.config.web_dir, "index.html");
    let descriptor = state.negotiator.resolve(&path, None, true);

    match FileStreamResponse::open(state.storage.as_ref(), descriptor) {
        Ok(mut session) => {
            let content = read_to_end(&mut session, state.config.stream_chunk_size)?;
            Ok(String::from_utf8_lossy(&content).into_owned())
        }
        Err(ArchiveError::NotFound(_)) | Err(ArchiveError::StorageUnavailable(_)) => {
            tracing::debug!("No index template at {}, using built-in page", path);
            Ok(DEFAULT_INDEX.to_string())
        }
        Err(e) => Err(e.into()),
    }
}

async fn static_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    if path.split('/').any(|segment| segment == "..") || path.contains(['\\', '\0']) {
        return Err(AppError::BadRequest("Invalid path".into()));
    }

    let full_path = join_path(&state.config.web_dir, &path);
    let guard = state.device_lock.clone().lock_owned().await;
    let descriptor = state.negotiator.resolve(&full_path, None, false);
    let session = FileStreamResponse::open(state.storage.as_ref(), descriptor).map_err(|e| match e {
        ArchiveError::NotFound(_) => AppError::NotFound(format!("{} not found", path)),
        other => other.into(),
    })?;
    stream_response(session, state.config.stream_chunk_size, guard)
}
