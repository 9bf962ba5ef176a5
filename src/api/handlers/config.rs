//! Bot configuration (single row).

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::auth::Principal;
use crate::{
    api::error::{ApiError, ErrorResponse},
    store::{BotConfig, BotConfigUpdate, SharedStore},
};

pub const DEFAULT_BOT_PREFIX: &str = "/";

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct ConfigRequest {
    #[serde(default)]
    pub bot_token: String,
    pub bot_prefix: Option<String>,
    pub bot_name: Option<String>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct ConfigResponse {
    pub message: String,
    pub config: BotConfig,
}

impl ConfigRequest {
    fn into_update(self) -> Result<BotConfigUpdate, ApiError> {
        let bot_token = self.bot_token.trim().to_string();
        if bot_token.is_empty() {
            return Err(ApiError::validation("bot_token is required"));
        }
        let bot_prefix = self
            .bot_prefix
            .map(|prefix| prefix.trim().to_string())
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or_else(|| DEFAULT_BOT_PREFIX.to_string());
        let bot_name = self
            .bot_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        Ok(BotConfigUpdate {
            bot_token,
            bot_prefix,
            bot_name,
        })
    }
}

#[utoipa::path(
    get,
    path = "/api/config",
    responses(
        (status = 200, description = "Current bot configuration", body = BotConfig),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 404, description = "No configuration saved yet", body = ErrorResponse)
    ),
    tag = "config"
)]
#[instrument(skip(store))]
pub async fn get_config(store: Extension<SharedStore>) -> Result<impl IntoResponse, ApiError> {
    match store.bot_config().await? {
        Some(config) => Ok(Json(config)),
        None => Err(ApiError::NotFound("Bot configuration not found".to_string())),
    }
}

#[utoipa::path(
    post,
    path = "/api/config",
    request_body = ConfigRequest,
    responses(
        (status = 200, description = "Configuration saved", body = ConfigResponse),
        (status = 400, description = "Invalid configuration", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse)
    ),
    tag = "config"
)]
#[instrument(skip(store, principal, payload), fields(admin_id = %principal.admin_id))]
pub async fn save_config(
    store: Extension<SharedStore>,
    principal: Extension<Principal>,
    payload: Option<Json<ConfigRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::validation("Missing payload"));
    };
    let update = request.into_update()?;
    let config = store.save_bot_config(&update, principal.admin_id).await?;

    info!(config_id = config.id, "Bot configuration saved");

    Ok((
        StatusCode::OK,
        Json(ConfigResponse {
            message: "Config updated successfully".to_string(),
            config,
        }),
    ))
}
