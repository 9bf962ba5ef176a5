//! Bot users: paged listing and ban/unban.

use axum::{
    extract::{Extension, Query},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::error::{ApiError, ErrorResponse},
    store::{BotUser, Page, SharedStore},
};

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;

#[derive(IntoParams, Deserialize, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct UsersQuery {
    /// 1-based page number.
    pub page: Option<i64>,
    /// Page size, clamped to 1..=100.
    pub limit: Option<i64>,
}

impl UsersQuery {
    fn page(&self) -> Page {
        Page {
            number: self.page.unwrap_or(1).max(1),
            limit: self
                .limit
                .unwrap_or(DEFAULT_PAGE_LIMIT)
                .clamp(1, MAX_PAGE_LIMIT),
        }
    }
}

#[derive(ToSchema, Serialize, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    fn new(page: Page, total: i64) -> Self {
        Self {
            page: page.number,
            limit: page.limit,
            total,
            pages: (total + page.limit - 1) / page.limit,
        }
    }
}

#[derive(ToSchema, Serialize, Debug)]
pub struct UsersResponse {
    pub users: Vec<BotUser>,
    pub pagination: Pagination,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct UpdateUserRequest {
    pub user_id: String,
    pub is_banned: bool,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct UpdateUserResponse {
    pub message: String,
    pub user: BotUser,
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(UsersQuery),
    responses(
        (status = 200, description = "Page of bot users, newest first", body = UsersResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse)
    ),
    tag = "users"
)]
#[instrument(skip(store))]
pub async fn list_users(
    store: Extension<SharedStore>,
    Query(query): Query<UsersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page();
    let (users, total) = store.list_bot_users(page).await?;
    Ok(Json(UsersResponse {
        users,
        pagination: Pagination::new(page, total),
    }))
}

#[utoipa::path(
    put,
    path = "/api/users",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Ban state updated", body = UpdateUserResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 404, description = "No such bot user", body = ErrorResponse)
    ),
    tag = "users"
)]
#[instrument(skip(store, payload))]
pub async fn update_user(
    store: Extension<SharedStore>,
    payload: Option<Json<UpdateUserRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::validation("user_id and is_banned are required"));
    };
    let user_id = request.user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::validation("user_id and is_banned are required"));
    }

    let Some(user) = store.set_user_banned(user_id, request.is_banned).await? else {
        return Err(ApiError::NotFound("User not found".to_string()));
    };

    info!(user_id, is_banned = user.is_banned, "Bot user updated");

    Ok(Json(UpdateUserResponse {
        message: "User updated successfully".to_string(),
        user,
    }))
}
