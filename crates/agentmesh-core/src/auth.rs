//! Auth Gate — pluggable per-request credential check.
//!
//! The gate is a predicate over incoming request headers. The reference
//! implementations recognize `X-API-Key: <k>` and `Authorization: Bearer
//! <tok>`. Unauthorized requests receive a bare HTTP 401. Well-known
//! discovery documents stay public; the gate protects `/rpc` and `/events`.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::server::AppState;

/// Predicate over the incoming request's credentials.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> bool;
}

/// Accepts every request.
pub struct NoAuth;

impl Authenticator for NoAuth {
    fn authenticate(&self, _headers: &HeaderMap) -> bool {
        true
    }
}

/// Requires `X-API-Key` to match the configured key.
pub struct ApiKeyAuth {
    key: String,
}

impl ApiKeyAuth {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Authenticator for ApiKeyAuth {
    fn authenticate(&self, headers: &HeaderMap) -> bool {
        headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|k| k == self.key)
    }
}

/// Requires `Authorization: Bearer` to match the configured token.
pub struct BearerAuth {
    token: String,
}

impl BearerAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Authenticator for BearerAuth {
    fn authenticate(&self, headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|t| t == self.token)
    }
}

/// Axum middleware enforcing the gate on protected routes.
pub async fn require_auth(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if state.auth.authenticate(req.headers()) {
        next.run(req).await
    } else {
        tracing::debug!(path = %req.uri().path(), "Rejected unauthenticated request");
        StatusCode::UNAUTHORIZED.into_response()
    }
}
