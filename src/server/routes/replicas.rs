use std::sync::Arc;

use axum::extract::{Path as UrlPath, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::info;

use fitconnect_core::replica;

use crate::server::error::ServerError;
use crate::server::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/replicas", get(list_replicas).post(create_replica))
        .route("/replicas/{uuid}", get(get_replica).delete(delete_replica))
}

async fn list_replicas(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ServerError> {
    let replicas = state.client.list_replicas(&state.config.owner_id).await?;
    Ok(Json(json!({ "success": true, "replicas": replicas })))
}

/// Provision the built-in FitConnect replica.
async fn create_replica(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ServerError> {
    let provisioned = replica::provision(
        &state.client,
        &replica::default_replica(),
        &state.config.training_dir,
        &state.client_config_path,
    )
    .await?;
    info!(uuid = %provisioned.client_config.uuid, "replica provisioned");

    Ok(Json(json!({
        "success": true,
        "message": "Replica created",
        "replica": provisioned.client_config,
        "trainingID": provisioned.training_id,
    })))
}

async fn get_replica(
    State(state): State<Arc<AppState>>,
    UrlPath(uuid): UrlPath<String>,
) -> Result<Json<Value>, ServerError> {
    let replica = state.client.get_replica(&uuid).await?;
    Ok(Json(json!({ "success": true, "replica": replica })))
}

async fn delete_replica(
    State(state): State<Arc<AppState>>,
    UrlPath(uuid): UrlPath<String>,
) -> Result<Json<Value>, ServerError> {
    state.client.delete_replica(&uuid).await?;
    info!(%uuid, "replica deleted");
    Ok(Json(json!({ "success": true, "message": "Replica deleted" })))
}
