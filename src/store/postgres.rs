//! `PostgreSQL` implementation of the store traits.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, Connection, PgPool, Row};
use tracing::{info_span, Instrument, Span};
use uuid::Uuid;

use super::{
    AdminRecord, BotCommand, BotConfig, BotConfigUpdate, BotStore, BotUser, CommandUsage,
    Counters, CredentialStore, InsertOutcome, Page, Store,
};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn query_span(operation: &'static str, statement: &'static str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

/// Advisory lock key serializing schema setup across processes.
const SCHEMA_LOCK_KEY: i64 = 0x626f_7464_6173_68;

/// Apply `sql/schema.sql` one statement at a time.
///
/// Runs in one transaction under an advisory lock, so instances starting
/// together do not race on `CREATE TABLE IF NOT EXISTS`.
///
/// # Errors
/// Returns an error if any statement fails.
pub async fn apply_schema(pool: &PgPool) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .context("failed to begin schema transaction")?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SCHEMA_LOCK_KEY)
        .execute(&mut *tx)
        .await
        .context("failed to take schema lock")?;

    for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
    }

    tx.commit().await.context("failed to commit schema")?;

    Ok(())
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn admin_from_row(row: &PgRow) -> Result<AdminRecord, sqlx::Error> {
    Ok(AdminRecord {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
    })
}

fn config_from_row(row: &PgRow) -> Result<BotConfig, sqlx::Error> {
    Ok(BotConfig {
        id: row.try_get("id")?,
        bot_token: row.try_get("bot_token")?,
        bot_prefix: row.try_get("bot_prefix")?,
        bot_name: row.try_get("bot_name")?,
        admin_id: row.try_get("admin_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn user_from_row(row: &PgRow) -> Result<BotUser, sqlx::Error> {
    Ok(BotUser {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        username: row.try_get("username")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        is_banned: row.try_get("is_banned")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn command_from_row(row: &PgRow) -> Result<BotCommand, sqlx::Error> {
    Ok(BotCommand {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        is_enabled: row.try_get("is_enabled")?,
        usage_count: row.try_get("usage_count")?,
        last_used: row.try_get("last_used")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_admin_by_email(&self, email: &str) -> Result<Option<AdminRecord>> {
        let query = "SELECT id, email, password_hash, created_at FROM admins WHERE email = $1";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup admin by email")?;

        row.as_ref()
            .map(admin_from_row)
            .transpose()
            .context("failed to decode admin row")
    }

    async fn insert_admin(&self, email: &str, password_hash: &str) -> Result<InsertOutcome> {
        let query = r"
            INSERT INTO admins (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, created_at
        ";
        let result = sqlx::query(query)
            .bind(Uuid::now_v7())
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", query))
            .await;

        match result {
            Ok(row) => Ok(InsertOutcome::Created(
                admin_from_row(&row).context("failed to decode admin row")?,
            )),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert admin"),
        }
    }
}

#[async_trait]
impl BotStore for PgStore {
    async fn bot_config(&self) -> Result<Option<BotConfig>> {
        let query = r"
            SELECT id, bot_token, bot_prefix, bot_name, admin_id, created_at, updated_at
            FROM bot_config
            ORDER BY id
            LIMIT 1
        ";
        let row = sqlx::query(query)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to fetch bot config")?;

        row.as_ref()
            .map(config_from_row)
            .transpose()
            .context("failed to decode bot config row")
    }

    async fn save_bot_config(&self, update: &BotConfigUpdate, admin_id: Uuid) -> Result<BotConfig> {
        // Unique `singleton` keeps concurrent first saves to one row.
        let query = r"
            INSERT INTO bot_config (bot_token, bot_prefix, bot_name, admin_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (singleton) DO UPDATE
            SET bot_token = EXCLUDED.bot_token,
                bot_prefix = EXCLUDED.bot_prefix,
                bot_name = EXCLUDED.bot_name,
                admin_id = EXCLUDED.admin_id,
                updated_at = NOW()
            RETURNING id, bot_token, bot_prefix, bot_name, admin_id, created_at, updated_at
        ";
        let row = sqlx::query(query)
            .bind(&update.bot_token)
            .bind(&update.bot_prefix)
            .bind(&update.bot_name)
            .bind(admin_id)
            .fetch_one(&self.pool)
            .instrument(query_span("UPSERT", query))
            .await
            .context("failed to save bot config")?;

        config_from_row(&row).context("failed to decode bot config row")
    }

    async fn list_bot_users(&self, page: Page) -> Result<(Vec<BotUser>, i64)> {
        let count_query = "SELECT COUNT(*) AS total FROM bot_users";
        let total: i64 = sqlx::query(count_query)
            .fetch_one(&self.pool)
            .instrument(query_span("SELECT", count_query))
            .await
            .context("failed to count bot users")?
            .try_get("total")?;

        let query = r"
            SELECT id, user_id, username, first_name, last_name, is_banned, created_at, updated_at
            FROM bot_users
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
        ";
        let rows = sqlx::query(query)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to list bot users")?;

        let users = rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()
            .context("failed to decode bot user row")?;

        Ok((users, total))
    }

    async fn set_user_banned(&self, user_id: &str, is_banned: bool) -> Result<Option<BotUser>> {
        let query = r"
            UPDATE bot_users
            SET is_banned = $2, updated_at = NOW()
            WHERE user_id = $1
            RETURNING id, user_id, username, first_name, last_name, is_banned, created_at, updated_at
        ";
        let row = sqlx::query(query)
            .bind(user_id)
            .bind(is_banned)
            .fetch_optional(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to update bot user")?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .context("failed to decode bot user row")
    }

    async fn list_commands(&self) -> Result<Vec<BotCommand>> {
        let query = r"
            SELECT id, name, description, is_enabled, usage_count, last_used, created_at
            FROM commands
            ORDER BY name
        ";
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to list commands")?;

        rows.iter()
            .map(command_from_row)
            .collect::<Result<Vec<_>, _>>()
            .context("failed to decode command row")
    }

    async fn set_command_enabled(&self, id: i64, is_enabled: bool) -> Result<Option<BotCommand>> {
        let query = r"
            UPDATE commands
            SET is_enabled = $2
            WHERE id = $1
            RETURNING id, name, description, is_enabled, usage_count, last_used, created_at
        ";
        let row = sqlx::query(query)
            .bind(id)
            .bind(is_enabled)
            .fetch_optional(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to update command")?;

        row.as_ref()
            .map(command_from_row)
            .transpose()
            .context("failed to decode command row")
    }

    async fn counters(&self) -> Result<Counters> {
        let query = r"
            SELECT
                (SELECT COUNT(*) FROM bot_users) AS users_total,
                (SELECT COUNT(*) FROM bot_users WHERE is_banned) AS users_banned,
                (SELECT COUNT(*) FROM commands) AS commands_total,
                (SELECT COUNT(*) FROM commands WHERE is_enabled) AS commands_enabled,
                (SELECT COALESCE(SUM(usage_count), 0)::BIGINT FROM commands) AS commands_executed
        ";
        let row = sqlx::query(query)
            .fetch_one(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to count stats")?;

        Ok(Counters {
            users_total: row.try_get("users_total")?,
            users_banned: row.try_get("users_banned")?,
            commands_total: row.try_get("commands_total")?,
            commands_enabled: row.try_get("commands_enabled")?,
            commands_executed: row.try_get("commands_executed")?,
        })
    }

    async fn top_commands(&self, limit: i64) -> Result<Vec<CommandUsage>> {
        let query = r"
            SELECT name, usage_count
            FROM commands
            ORDER BY usage_count DESC, name
            LIMIT $1
        ";
        let rows = sqlx::query(query)
            .bind(limit)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to fetch top commands")?;

        rows.iter()
            .map(|row| {
                Ok(CommandUsage {
                    name: row.try_get("name")?,
                    usage_count: row.try_get("usage_count")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .context("failed to decode command usage row")
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("failed to acquire database connection")?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .context("failed to ping database")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[test]
    fn split_sql_statements_skips_comments_and_blank_lines() {
        let statements = split_sql_statements(
            "-- header\n\nCREATE TABLE a (\n  id INT\n);\n-- between\nCREATE INDEX b ON a (id);\n",
        );
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE a"));
        assert!(statements[0].ends_with(");"));
        assert_eq!(statements[1], "CREATE INDEX b ON a (id);");
    }

    #[test]
    fn split_sql_statements_keeps_unterminated_tail() {
        let statements = split_sql_statements("SELECT 1;\nSELECT 2");
        assert_eq!(statements, vec!["SELECT 1;".to_string(), "SELECT 2".to_string()]);
    }

    #[test]
    fn bundled_schema_creates_every_table() {
        let statements = split_sql_statements(SCHEMA_SQL);
        for table in ["admins", "bot_config", "bot_users", "commands"] {
            assert!(
                statements
                    .iter()
                    .any(|s| s.starts_with(&format!("CREATE TABLE IF NOT EXISTS {table} ("))),
                "missing table {table}"
            );
        }
    }

    #[test]
    fn bot_config_is_a_schema_singleton() {
        let statements = split_sql_statements(SCHEMA_SQL);
        let bot_config = statements
            .iter()
            .find(|s| s.starts_with("CREATE TABLE IF NOT EXISTS bot_config ("));
        assert!(bot_config.is_some_and(|s| s.contains("UNIQUE CHECK (singleton)")));
    }

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }
}
