//! Bearer token authentication.
//!
//! Each API token belongs to one workspace and user. The middleware resolves
//! it into a [`WorkspaceContext`] request extension that handlers pass on to
//! the services.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use mailport_core::MailportError;
use tracing::debug;

use crate::error::ApiError;
use crate::handlers::ManagementState;
use crate::models::WorkspaceContext;

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Axum middleware that attaches the caller's [`WorkspaceContext`].
pub async fn auth_middleware(
    State(state): State<ManagementState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&req) else {
        return ApiError(MailportError::Unauthorized(
            "Missing bearer token".to_string(),
        ))
        .into_response();
    };

    let api_token = match state.store.find_api_token(token) {
        Ok(Some(api_token)) => api_token,
        Ok(None) => {
            return ApiError(MailportError::Unauthorized(
                "Invalid or expired bearer token".to_string(),
            ))
            .into_response()
        }
        Err(e) => return ApiError(e).into_response(),
    };

    // A token whose workspace is gone is refused.
    match state.store.get_workspace(api_token.workspace_id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return ApiError(MailportError::Unauthorized(
                "Workspace no longer exists".to_string(),
            ))
            .into_response()
        }
        Err(e) => return ApiError(e).into_response(),
    }

    debug!(workspace_id = %api_token.workspace_id, "Request authenticated");
    req.extensions_mut().insert(WorkspaceContext {
        workspace_id: api_token.workspace_id,
        user_id: api_token.user_id,
    });
    next.run(req).await
}
