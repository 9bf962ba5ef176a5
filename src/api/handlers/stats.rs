use axum::{extract::Extension, response::IntoResponse, Json};
use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;

use crate::{
    api::error::{ApiError, ErrorResponse},
    store::{CommandUsage, Counters, SharedStore},
};

const TOP_COMMANDS: i64 = 5;

#[derive(ToSchema, Serialize, Debug, PartialEq, Eq)]
pub struct UserStats {
    pub total: i64,
    pub banned: i64,
    pub active: i64,
}

#[derive(ToSchema, Serialize, Debug, PartialEq, Eq)]
pub struct CommandStats {
    pub total: i64,
    pub enabled: i64,
    pub disabled: i64,
    /// Total invocations across all commands.
    pub executed: i64,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct StatsResponse {
    pub users: UserStats,
    pub commands: CommandStats,
    /// `None` until a command exists.
    pub most_used_command: Option<String>,
    pub top_commands: Vec<CommandUsage>,
}

impl From<&Counters> for UserStats {
    fn from(counters: &Counters) -> Self {
        Self {
            total: counters.users_total,
            banned: counters.users_banned,
            active: counters.users_total - counters.users_banned,
        }
    }
}

impl From<&Counters> for CommandStats {
    fn from(counters: &Counters) -> Self {
        Self {
            total: counters.commands_total,
            enabled: counters.commands_enabled,
            disabled: counters.commands_total - counters.commands_enabled,
            executed: counters.commands_executed,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/stats",
    responses(
        (status = 200, description = "Dashboard counters", body = StatsResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse)
    ),
    tag = "stats"
)]
#[instrument(skip(store))]
pub async fn stats(store: Extension<SharedStore>) -> Result<impl IntoResponse, ApiError> {
    let counters = store.counters().await?;
    let top_commands = store.top_commands(TOP_COMMANDS).await?;
    Ok(Json(StatsResponse {
        users: UserStats::from(&counters),
        commands: CommandStats::from(&counters),
        most_used_command: top_commands.first().map(|usage| usage.name.clone()),
        top_commands,
    }))
}
