//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::web::state::AppState;

/// The resolved owner of the request, inserted into request extensions by
/// `require_auth` for handlers to pick up via `Extension`.
#[derive(Debug, Clone)]
pub struct AuthedUser(pub String);

/// Middleware that resolves the bearer credential and extracts the user id.
///
/// If valid, inserts an `AuthedUser` into request extensions for handlers to
/// use. If invalid or missing, returns 401 with the uniform
/// `{status, message}` body.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    // 1. Extract the bearer token
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| unauthorized("Authorization token is required"))?;

    // 2. Resolve it to a stable user id
    let user_id = state.identity.resolve_user(token).await.map_err(|e| {
        debug!("failed to resolve bearer token: {e:?}");
        unauthorized("Unauthorized")
    })?;

    // 3. Insert the user id into request extensions
    req.extensions_mut().insert(AuthedUser(user_id));

    // 4. Continue to the handler
    Ok(next.run(req).await)
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "status": false, "message": message })),
    )
        .into_response()
}
