//! Proxy for the embeddable chat widget: forwards one turn to the configured
//! replica so the organization secret never reaches the browser.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::server::error::ServerError;
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub content: String,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(send_chat))
}

async fn send_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<Value>, ServerError> {
    if req.content.trim().is_empty() {
        return Err(ServerError::BadRequest("content is required".into()));
    }
    let replica_uuid = state
        .config
        .replica_uuid()
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    debug!(chars = req.content.len(), "forwarding chat turn");
    let content = state
        .client
        .chat_completion(replica_uuid, &state.config.user_id, &req.content)
        .await?;

    Ok(Json(json!({ "success": true, "content": content })))
}
