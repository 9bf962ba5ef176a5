//! In-memory store used by handler tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard,
};
use uuid::Uuid;

use super::{
    AdminRecord, BotCommand, BotConfig, BotConfigUpdate, BotStore, BotUser, CommandUsage,
    Counters, CredentialStore, InsertOutcome, Page, Store,
};

#[derive(Debug, Default)]
struct Tables {
    admins: Vec<AdminRecord>,
    config: Option<BotConfig>,
    users: Vec<BotUser>,
    commands: Vec<BotCommand>,
}

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    tables: Mutex<Tables>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make every call fail like an unreachable database.
    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        self.tables.lock().map_err(|_| anyhow!("memory store poisoned"))
    }

    pub(crate) fn admin_count(&self) -> usize {
        self.tables.lock().map(|t| t.admins.len()).unwrap_or(0)
    }

    pub(crate) fn add_user(&self, user_id: &str, username: &str, is_banned: bool) -> Result<()> {
        let mut tables = self.tables()?;
        let id = i64::try_from(tables.users.len())? + 1;
        let now = Utc::now() + chrono::Duration::seconds(id);
        tables.users.push(BotUser {
            id,
            user_id: user_id.to_string(),
            username: Some(username.to_string()),
            first_name: None,
            last_name: None,
            is_banned,
            created_at: now,
            updated_at: now,
        });
        Ok(())
    }

    pub(crate) fn add_command(&self, name: &str, is_enabled: bool, usage_count: i64) -> Result<i64> {
        let mut tables = self.tables()?;
        let id = i64::try_from(tables.commands.len())? + 1;
        tables.commands.push(BotCommand {
            id,
            name: name.to_string(),
            description: None,
            is_enabled,
            usage_count,
            last_used: None,
            created_at: Utc::now(),
        });
        Ok(id)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_admin_by_email(&self, email: &str) -> Result<Option<AdminRecord>> {
        let tables = self.tables()?;
        Ok(tables.admins.iter().find(|a| a.email == email).cloned())
    }

    async fn insert_admin(&self, email: &str, password_hash: &str) -> Result<InsertOutcome> {
        let mut tables = self.tables()?;
        if tables.admins.iter().any(|a| a.email == email) {
            return Ok(InsertOutcome::Conflict);
        }
        let record = AdminRecord {
            id: Uuid::now_v7(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        tables.admins.push(record.clone());
        Ok(InsertOutcome::Created(record))
    }
}

#[async_trait]
impl BotStore for MemoryStore {
    async fn bot_config(&self) -> Result<Option<BotConfig>> {
        Ok(self.tables()?.config.clone())
    }

    async fn save_bot_config(&self, update: &BotConfigUpdate, admin_id: Uuid) -> Result<BotConfig> {
        let mut tables = self.tables()?;
        let now = Utc::now();
        let config = match tables.config.take() {
            Some(existing) => BotConfig {
                bot_token: update.bot_token.clone(),
                bot_prefix: update.bot_prefix.clone(),
                bot_name: update.bot_name.clone(),
                admin_id: Some(admin_id),
                updated_at: now,
                ..existing
            },
            None => BotConfig {
                id: 1,
                bot_token: update.bot_token.clone(),
                bot_prefix: update.bot_prefix.clone(),
                bot_name: update.bot_name.clone(),
                admin_id: Some(admin_id),
                created_at: now,
                updated_at: now,
            },
        };
        tables.config = Some(config.clone());
        Ok(config)
    }

    async fn list_bot_users(&self, page: Page) -> Result<(Vec<BotUser>, i64)> {
        let tables = self.tables()?;
        let mut users = tables.users.clone();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = i64::try_from(users.len())?;
        let page_items = users
            .into_iter()
            .skip(usize::try_from(page.offset())?)
            .take(usize::try_from(page.limit)?)
            .collect();
        Ok((page_items, total))
    }

    async fn set_user_banned(&self, user_id: &str, is_banned: bool) -> Result<Option<BotUser>> {
        let mut tables = self.tables()?;
        Ok(tables
            .users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .map(|user| {
                user.is_banned = is_banned;
                user.updated_at = Utc::now();
                user.clone()
            }))
    }

    async fn list_commands(&self) -> Result<Vec<BotCommand>> {
        let mut commands = self.tables()?.commands.clone();
        commands.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(commands)
    }

    async fn set_command_enabled(&self, id: i64, is_enabled: bool) -> Result<Option<BotCommand>> {
        let mut tables = self.tables()?;
        Ok(tables.commands.iter_mut().find(|c| c.id == id).map(|command| {
            command.is_enabled = is_enabled;
            command.clone()
        }))
    }

    async fn counters(&self) -> Result<Counters> {
        let tables = self.tables()?;
        let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
        Ok(Counters {
            users_total: count(tables.users.len()),
            users_banned: count(tables.users.iter().filter(|u| u.is_banned).count()),
            commands_total: count(tables.commands.len()),
            commands_enabled: count(tables.commands.iter().filter(|c| c.is_enabled).count()),
            commands_executed: tables
                .commands
                .iter()
                .fold(0_i64, |sum, c| sum.saturating_add(c.usage_count)),
        })
    }

    async fn top_commands(&self, limit: i64) -> Result<Vec<CommandUsage>> {
        let mut commands = self.tables()?.commands.clone();
        commands.sort_by(|a, b| b.usage_count.cmp(&a.usage_count).then(a.name.cmp(&b.name)));
        Ok(commands
            .into_iter()
            .take(usize::try_from(limit)?)
            .map(|c| CommandUsage {
                name: c.name,
                usage_count: c.usage_count,
            })
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        self.tables().map(|_| ())
    }
}
