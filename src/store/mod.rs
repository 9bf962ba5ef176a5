//! Persistence seams for administrators and bot resources.
//!
//! Handlers only see [`SharedStore`]; the server wires in [`PgStore`], tests
//! use an in-memory implementation.

mod postgres;

#[cfg(test)]
pub(crate) mod memory;

pub use postgres::{apply_schema, PgStore};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

pub type SharedStore = Arc<dyn Store>;

/// Administrator row as returned to the auth layer. Carries the hash, so it
/// must never be serialized into a response.
#[derive(Clone, Debug)]
pub struct AdminRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of inserting a new administrator.
#[derive(Debug)]
pub enum InsertOutcome {
    Created(AdminRecord),
    Conflict,
}

/// Credential lookups and inserts keyed by email.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_admin_by_email(&self, email: &str) -> Result<Option<AdminRecord>>;

    /// Uniqueness is enforced by the backend; a duplicate email yields
    /// [`InsertOutcome::Conflict`] and leaves the existing row untouched.
    async fn insert_admin(&self, email: &str, password_hash: &str) -> Result<InsertOutcome>;
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct BotConfig {
    pub id: i64,
    pub bot_token: String,
    pub bot_prefix: String,
    pub bot_name: Option<String>,
    pub admin_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct BotConfigUpdate {
    pub bot_token: String,
    pub bot_prefix: String,
    pub bot_name: Option<String>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct BotUser {
    pub id: i64,
    /// Telegram user id.
    pub user_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct BotCommand {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_enabled: bool,
    pub usage_count: i64,
    pub last_used: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
    pub limit: i64,
}

impl Page {
    #[must_use]
    pub fn offset(self) -> i64 {
        (self.number - 1).saturating_mul(self.limit)
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct CommandUsage {
    pub name: String,
    pub usage_count: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    pub users_total: i64,
    pub users_banned: i64,
    pub commands_total: i64,
    pub commands_enabled: i64,
    /// Sum of `usage_count` over all commands.
    pub commands_executed: i64,
}

/// Bot configuration, users and commands as managed from the dashboard.
#[async_trait]
pub trait BotStore: Send + Sync {
    async fn bot_config(&self) -> Result<Option<BotConfig>>;

    /// Update the single configuration row, inserting it on first save.
    async fn save_bot_config(&self, update: &BotConfigUpdate, admin_id: Uuid) -> Result<BotConfig>;

    /// Newest first. Returns the page plus the total row count.
    async fn list_bot_users(&self, page: Page) -> Result<(Vec<BotUser>, i64)>;

    async fn set_user_banned(&self, user_id: &str, is_banned: bool) -> Result<Option<BotUser>>;

    async fn list_commands(&self) -> Result<Vec<BotCommand>>;

    async fn set_command_enabled(&self, id: i64, is_enabled: bool) -> Result<Option<BotCommand>>;

    async fn counters(&self) -> Result<Counters>;

    async fn top_commands(&self, limit: i64) -> Result<Vec<CommandUsage>>;
}

#[async_trait]
pub trait Store: CredentialStore + BotStore {
    /// Round-trip to the backend, used by `/api/health`.
    async fn ping(&self) -> Result<()>;
}
