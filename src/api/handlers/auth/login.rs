use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{
    password::{verify_dummy, verify_password},
    session::session_cookie,
    state::AuthState,
    types::{AuthUser, Credentials, LoginResponse},
    utils::normalize_email,
};
use crate::{
    api::error::{ApiError, ErrorResponse},
    store::SharedStore,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Login successful, session cookie set", body = LoginResponse),
        (status = 400, description = "Email or password missing", body = ErrorResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(store, auth_state, payload))]
pub async fn login(
    store: Extension<SharedStore>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<Credentials>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::validation("Email and password are required"));
    };
    let email = normalize_email(&request.email);
    if email.is_empty() || request.password.is_empty() {
        return Err(ApiError::validation("Email and password are required"));
    }

    let Some(admin) = store.find_admin_by_email(&email).await? else {
        // Same cost as a real comparison so unknown emails are not observable.
        verify_dummy(request.password).await;
        debug!("Login for unknown email");
        return Err(ApiError::Authentication(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_password(request.password, admin.password_hash).await? {
        debug!(admin_id = %admin.id, "Login with wrong password");
        return Err(ApiError::Authentication(INVALID_CREDENTIALS.to_string()));
    }

    let token = auth_state.tokens().issue(admin.id)?;
    let cookie = session_cookie(auth_state.config(), &token)
        .map_err(|err| anyhow::anyhow!("failed to build session cookie: {err}"))?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);

    info!(admin_id = %admin.id, "Admin logged in");

    Ok((
        StatusCode::OK,
        headers,
        Json(LoginResponse {
            message: "Login successful".to_string(),
            user: AuthUser {
                id: admin.id,
                email: admin.email,
            },
        }),
    ))
}
