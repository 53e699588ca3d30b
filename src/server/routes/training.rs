use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use fitconnect_core::replica::{self, text_with_source};
use fitconnect_core::training::{self, CONTENT_LIMIT};
use fitconnect_core::TrainingUpdate;

use crate::server::error::ServerError;
use crate::server::state::AppState;

/// API version the advanced training update is sent with.
pub const ADVANCED_API_VERSION: &str = "2025-03-25";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/training", post(upload_training))
        .route("/training-advanced", post(upload_training_advanced))
        .route("/training-files", get(list_training_files))
        .route("/training-content", get(list_training_content))
        .route("/training-content/{id}", delete(delete_training_content))
}

/// Multipart form with `replicaUUID` and one of `text` or `file`.
async fn upload_training(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ServerError> {
    let mut replica_uuid = None;
    let mut text = None;
    let mut file: Option<(String, String)> = None;
    let mut url = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("failed to read multipart field: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("failed to read file: {e}")))?;
                let content = String::from_utf8(bytes.to_vec())
                    .map_err(|_| ServerError::BadRequest("file must be UTF-8 text".into()))?;
                file = Some((file_name, content));
            }
            "replicaUUID" | "text" | "url" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("failed to read {name}: {e}")))?;
                let value = Some(value).filter(|v| !v.trim().is_empty());
                match name.as_str() {
                    "replicaUUID" => replica_uuid = value,
                    "text" => text = value,
                    _ => url = value,
                }
            }
            other => debug!(field = other, "ignoring unknown multipart field"),
        }
    }

    let replica_uuid =
        replica_uuid.ok_or_else(|| ServerError::BadRequest("replicaUUID is required".into()))?;

    let update = match (file, text, url) {
        (Some((file_name, content)), _, _) => text_with_source(&content, "file_upload", &file_name),
        (None, Some(text), _) => TrainingUpdate::raw(text),
        (None, None, Some(_)) => {
            return Err(ServerError::BadRequest(
                "training from a URL is not supported".into(),
            ))
        }
        (None, None, None) => {
            return Err(ServerError::BadRequest("text or file is required".into()))
        }
    };

    let training_id = replica::train_text(&state.client, &replica_uuid, &update, None).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Training content sent",
        "trainingID": training_id,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedTraining {
    #[serde(default, rename = "replicaUUID")]
    pub replica_uuid: Option<String>,
    #[serde(default)]
    pub raw_text: Option<String>,
    #[serde(default)]
    pub processed_text: Option<String>,
    #[serde(default)]
    pub vector_entry_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl AdvancedTraining {
    /// The update body with blank fields left out.
    fn to_update(&self) -> TrainingUpdate {
        let present = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        TrainingUpdate {
            raw_text: present(&self.raw_text),
            processed_text: present(&self.processed_text),
            vector_entry_id: present(&self.vector_entry_id),
            metadata: self.metadata.clone().filter(|m| !m.is_empty()),
        }
    }
}

async fn upload_training_advanced(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdvancedTraining>,
) -> Result<Json<Value>, ServerError> {
    let replica_uuid = req
        .replica_uuid
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ServerError::BadRequest("replicaUUID is required".into()))?;

    let update = req.to_update();
    if update.is_empty() {
        return Err(ServerError::BadRequest(
            "rawText or processedText is required".into(),
        ));
    }

    let training_id =
        replica::train_text(&state.client, replica_uuid, &update, Some(ADVANCED_API_VERSION))
            .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Advanced training content sent",
        "trainingID": training_id,
    })))
}

async fn list_training_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ServerError> {
    let files = training::list_training_files(&state.config.training_dir)?;
    Ok(Json(json!({ "success": true, "files": files })))
}

#[derive(Debug, Deserialize)]
pub struct ContentQuery {
    #[serde(rename = "replicaUUID")]
    pub replica_uuid: Option<String>,
}

async fn list_training_content(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ContentQuery>,
) -> Result<Json<Value>, ServerError> {
    let items = state.client.list_training(CONTENT_LIMIT).await?;
    let filter = query.replica_uuid.as_deref().filter(|u| !u.is_empty());
    let content = training::group_training(items, filter);

    let mut by_replica = Map::new();
    for group in content.groups {
        by_replica.insert(group.replica_uuid, json!(group.items));
    }

    Ok(Json(json!({
        "success": true,
        "trainingByReplica": by_replica,
        "totalItems": content.total_items,
    })))
}

async fn delete_training_content(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServerError> {
    let id: i64 = id
        .parse()
        .map_err(|_| ServerError::BadRequest(format!("invalid training id: {id}")))?;
    state.client.delete_training(id).await?;
    info!(id, "training entry deleted");
    Ok(Json(json!({ "success": true, "message": "Training entry deleted" })))
}
