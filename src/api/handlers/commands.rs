//! Bot commands: listing and enable/disable.

use axum::{extract::Extension, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::{
    api::error::{ApiError, ErrorResponse},
    store::{BotCommand, SharedStore},
};

#[derive(ToSchema, Serialize, Debug)]
pub struct CommandsResponse {
    pub commands: Vec<BotCommand>,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct UpdateCommandRequest {
    pub command_id: i64,
    pub is_enabled: bool,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct UpdateCommandResponse {
    pub message: String,
    pub command: BotCommand,
}

#[utoipa::path(
    get,
    path = "/api/commands",
    responses(
        (status = 200, description = "All commands ordered by name", body = CommandsResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse)
    ),
    tag = "commands"
)]
#[instrument(skip(store))]
pub async fn list_commands(store: Extension<SharedStore>) -> Result<impl IntoResponse, ApiError> {
    let commands = store.list_commands().await?;
    Ok(Json(CommandsResponse { commands }))
}

#[utoipa::path(
    put,
    path = "/api/commands",
    request_body = UpdateCommandRequest,
    responses(
        (status = 200, description = "Command updated", body = UpdateCommandResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 404, description = "No such command", body = ErrorResponse)
    ),
    tag = "commands"
)]
#[instrument(skip(store, payload))]
pub async fn update_command(
    store: Extension<SharedStore>,
    payload: Option<Json<UpdateCommandRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::validation("command_id and is_enabled are required"));
    };

    let Some(command) = store
        .set_command_enabled(request.command_id, request.is_enabled)
        .await?
    else {
        return Err(ApiError::NotFound("Command not found".to_string()));
    };

    info!(
        command = %command.name,
        is_enabled = command.is_enabled,
        "Bot command updated"
    );

    Ok(Json(UpdateCommandResponse {
        message: "Command updated successfully".to_string(),
        command,
    }))
}
