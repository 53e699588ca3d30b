//! Read and edit the training text files on disk.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use fitconnect_core::training;

use crate::server::error::ServerError;
use crate::server::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/files/{*path}", get(read_file).put(write_file))
}

#[derive(Debug, Deserialize)]
pub struct FileWrite {
    pub content: Option<String>,
}

async fn read_file(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Json<Value>, ServerError> {
    let content = training::read_training_file(&state.config.training_dir, &path)?;
    Ok(Json(json!({ "success": true, "content": content, "path": path })))
}

async fn write_file(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    Json(body): Json<FileWrite>,
) -> Result<Json<Value>, ServerError> {
    let content = body
        .content
        .ok_or_else(|| ServerError::BadRequest("content is required".into()))?;
    let written = training::write_training_file(&state.config.training_dir, &path, &content)?;
    info!(path = %written.display(), bytes = content.len(), "training file saved");
    Ok(Json(json!({ "success": true, "message": "File saved" })))
}
