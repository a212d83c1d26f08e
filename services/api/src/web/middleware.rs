//! services/api/src/web/middleware.rs
//!
//! Caller identity for protected routes.

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;

/// The header the upstream auth layer sets after authenticating the caller.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Middleware that reads the caller's id from the `x-user-id` header.
///
/// The header is trusted as-is. If it parses, the id is inserted into request
/// extensions for handlers to use. If it is missing or malformed, returns 401.
pub async fn require_user(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .ok_or_else(|| {
            debug!("Rejecting request without a valid {} header", USER_ID_HEADER);
            ApiError::Unauthorized
        })?;

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}
