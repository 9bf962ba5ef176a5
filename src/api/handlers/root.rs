use axum::response::IntoResponse;

use crate::{APP_USER_AGENT, GIT_COMMIT_HASH};

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service banner", body = String, content_type = "text/plain")
    ),
    tag = "health"
)]
pub async fn root() -> impl IntoResponse {
    format!("{APP_USER_AGENT} ({GIT_COMMIT_HASH})\n")
}
