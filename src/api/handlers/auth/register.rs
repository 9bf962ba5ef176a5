use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    password::hash_password,
    state::AuthState,
    types::{AuthUser, Credentials},
    utils::{normalize_email, valid_email},
};
use crate::{
    api::error::{ApiError, ErrorResponse},
    store::{InsertOutcome, SharedStore},
};

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = Credentials,
    responses(
        (status = 201, description = "Administrator created", body = AuthUser),
        (status = 400, description = "Invalid input or email already registered", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(store, auth_state, payload))]
pub async fn register(
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
    if !valid_email(&email) {
        return Err(ApiError::validation("Invalid email address"));
    }
    let min_length = auth_state.config().password_min_length();
    if request.password.chars().count() < min_length {
        return Err(ApiError::Validation(format!(
            "Password must be at least {min_length} characters"
        )));
    }

    let password_hash = hash_password(request.password).await?;

    match store.insert_admin(&email, &password_hash).await? {
        InsertOutcome::Created(admin) => {
            info!(admin_id = %admin.id, "Admin registered");
            Ok((
                StatusCode::CREATED,
                Json(AuthUser {
                    id: admin.id,
                    email: admin.email,
                }),
            ))
        }
        InsertOutcome::Conflict => Err(ApiError::Conflict("Email already registered".to_string())),
    }
}
