use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use crate::server::error::ServerError;
use crate::server::state::AppState;

pub const PASSWORD_HEADER: &str = "x-admin-password";

fn provided_password(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .or_else(|| headers.get(PASSWORD_HEADER).and_then(|v| v.to_str().ok()))
}

/// Constant-time within equal lengths; a length mismatch fails early.
fn passwords_match(given: &str, expected: &str) -> bool {
    let given = given.as_bytes();
    let expected = expected.as_bytes();
    given.len() == expected.len() && bool::from(given.ct_eq(expected))
}

/// Admin routes are open unless a password is configured.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(expected) = state.config.admin_password.as_deref() {
        match provided_password(req.headers()) {
            Some(given) if passwords_match(given, expected) => {}
            _ => return ServerError::Unauthorized.into_response(),
        }
    }
    next.run(req).await
}
