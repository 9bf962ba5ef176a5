//! Route guard applied in front of every route.
//!
//! Each request is classified as public (allow-list) or protected. Protected
//! requests need a valid `auth_token` cookie; the verified [`Principal`] is
//! then inserted into the request extensions. Rejections are `401` JSON for
//! API-shaped requests and a `307` redirect to `/login` for page navigation.

use axum::{
    extract::{Request, State},
    http::{header::ACCEPT, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use std::sync::Arc;
use tracing::debug;

use super::{
    principal::Principal, session::extract_session_token, state::AuthState, token::TokenService,
};
use crate::api::error::{ErrorResponse, UNAUTHORIZED};

pub const LOGIN_PATH: &str = "/login";

const PUBLIC_PATHS: &[&str] = &[
    "/",
    "/login",
    "/register",
    "/api/health",
    "/api/auth/login",
    "/api/auth/register",
    "/api/auth/check",
    "/api/auth/logout",
    "/api-docs/openapi.json",
    "/favicon.ico",
];

const PUBLIC_PREFIXES: &[&str] = &[
    "/assets/",
    "/static/",
    "/_next/static/",
    "/_next/image/",
    "/public/",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Public route, forwarded untouched.
    Pass,
    Allow(Principal),
    RejectApi,
    RejectRedirect,
}

#[must_use]
pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path) || PUBLIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// API-shaped requests get a JSON 401 instead of a redirect.
#[must_use]
pub fn wants_json(path: &str, headers: &HeaderMap) -> bool {
    if path.starts_with("/api/") {
        return true;
    }
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|accept| accept.contains("application/json") && !accept.contains("text/html"))
}

/// Pure decision for one request given the token service and clock.
#[must_use]
pub fn decide(path: &str, headers: &HeaderMap, tokens: &TokenService, now: i64) -> Decision {
    if is_public_path(path) {
        return Decision::Pass;
    }
    let reject = || {
        if wants_json(path, headers) {
            Decision::RejectApi
        } else {
            Decision::RejectRedirect
        }
    };
    let Some(token) = extract_session_token(headers) else {
        debug!(path, "No session cookie on protected route");
        return reject();
    };
    match tokens.verify_at(&token, now) {
        Ok(principal) => Decision::Allow(principal),
        Err(err) => {
            debug!(path, "Session token rejected: {err}");
            reject()
        }
    }
}

pub async fn route_guard(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let decision = decide(
        request.uri().path(),
        request.headers(),
        auth_state.tokens(),
        super::token::now_unix_seconds(),
    );
    match decision {
        Decision::Pass => next.run(request).await,
        Decision::Allow(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Decision::RejectApi => {
            (StatusCode::UNAUTHORIZED, Json(ErrorResponse::new(UNAUTHORIZED))).into_response()
        }
        Decision::RejectRedirect => Redirect::temporary(LOGIN_PATH).into_response(),
    }
}
