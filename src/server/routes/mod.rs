//! Router construction.
//!
//! - `/health`
//! - `/api/chat` for the widget
//! - `/api/admin/*`, behind the admin password when one is configured

mod chat;
mod files;
mod health;
mod replicas;
mod training;

use std::sync::Arc;

use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::auth;
use crate::server::state::AppState;

pub fn build(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .merge(replicas::router())
        .merge(training::router())
        .merge(files::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    let api = Router::new().merge(chat::router()).nest("/admin", admin);

    Router::new()
        .merge(health::router())
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}
