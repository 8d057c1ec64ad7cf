use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::Span;
use uuid::Uuid;

use crate::features::auth::{AuthenticatedUser, TokenService};
use crate::features::users::UserService;
use crate::shared::constants::SESSION_COOKIE;
use crate::shared::cookies::get_cookie;

/// Request ID generator using UUID v7 (time-ordered)
#[derive(Clone, Copy)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Custom MakeSpan that includes request_id in the tracing span
#[derive(Clone, Debug)]
pub struct MakeSpanWithRequestId;

impl<B> tower_http::trace::MakeSpan<B> for MakeSpanWithRequestId {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

/// Dependencies for resolving the session cookie
#[derive(Clone)]
pub struct SessionState {
    pub tokens: Arc<TokenService>,
    pub users: Arc<UserService>,
}

/// Resolve the session cookie into an [`AuthenticatedUser`] request extension.
///
/// Requests without a valid session pass through untouched; handlers that
/// need a user reject them via the extractor.
pub async fn session_middleware(
    State(state): State<SessionState>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(token) = get_cookie(req.headers(), SESSION_COOKIE) {
        match state.tokens.verify_session(&token) {
            Ok(user_id) => match state.users.find_by_id(user_id).await {
                Ok(Some(user)) => {
                    req.extensions_mut().insert(AuthenticatedUser::from(user));
                }
                Ok(None) => tracing::debug!("Session names unknown user {}", user_id),
                Err(e) => tracing::warn!("Failed to load session user {}: {}", user_id, e),
            },
            Err(e) => tracing::debug!("Ignoring session cookie: {}", e),
        }
    }

    next.run(req).await
}
