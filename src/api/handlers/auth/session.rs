//! Session cookie transport plus the check and logout endpoints.

use axum::{
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::{debug, error};

use super::{
    state::{AuthConfig, AuthState},
    types::{CheckResponse, MessageResponse},
};

pub const SESSION_COOKIE_NAME: &str = "auth_token";

#[utoipa::path(
    get,
    path = "/api/auth/check",
    responses(
        (status = 200, description = "Session cookie is valid", body = CheckResponse),
        (status = 401, description = "Cookie missing, malformed or expired", body = CheckResponse)
    ),
    tag = "auth"
)]
pub async fn check(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let Some(token) = extract_session_token(&headers) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(CheckResponse {
                authenticated: false,
            }),
        );
    };
    match auth_state.tokens().verify(&token) {
        Ok(_) => (
            StatusCode::OK,
            Json(CheckResponse {
                authenticated: true,
            }),
        ),
        Err(err) => {
            debug!("Session check rejected: {err}");
            (
                StatusCode::UNAUTHORIZED,
                Json(CheckResponse {
                    authenticated: false,
                }),
            )
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn logout(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    // Tokens are not tracked server side; clearing the cookie is all we can do.
    let mut response_headers = HeaderMap::new();
    match clear_session_cookie(auth_state.config()) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build logout cookie: {err}"),
    }
    (
        StatusCode::OK,
        response_headers,
        Json(MessageResponse {
            message: "Logout successful".to_string(),
        }),
    )
}

/// Build the `HttpOnly` cookie carrying a freshly issued token.
pub(super) fn session_cookie(
    auth_config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = auth_config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if auth_config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn clear_session_cookie(
    auth_config: &AuthConfig,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if auth_config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// First non-empty `auth_token` across all `Cookie` headers.
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == SESSION_COOKIE_NAME).then(|| val.trim())
        })
        .find(|val| !val.is_empty())
        .map(str::to_string)
}
