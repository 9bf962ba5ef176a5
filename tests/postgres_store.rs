//! Integration test for the Postgres store.
//!
//! Flow:
//! 1. Connect to the database named by `BOTDASH_TEST_DSN` (skipped when unset).
//! 2. Apply the bundled schema twice to prove it is idempotent.
//! 3. Register an admin, then retry the same email and expect a conflict.
//! 4. Save the bot config twice, then race two first saves on an empty table,
//!    and check there is only ever one row.
//! 5. Seed bot users and commands, then exercise ban, toggle, paging and stats.

use anyhow::{bail, Context, Result};
use botdash::store::{
    apply_schema, BotConfigUpdate, BotStore, CredentialStore, InsertOutcome, Page, PgStore, Store,
};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

const DSN_ENV: &str = "BOTDASH_TEST_DSN";

async fn connect() -> Result<Option<PgStore>> {
    let Ok(dsn) = std::env::var(DSN_ENV) else {
        eprintln!("Skipping Postgres store test: {DSN_ENV} is not set");
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&dsn)
        .await
        .context("failed to connect to test database")?;

    apply_schema(&pool).await?;
    apply_schema(&pool).await.context("schema is not idempotent")?;

    Ok(Some(PgStore::new(pool)))
}

#[tokio::test]
async fn admin_registration_is_unique_per_email() -> Result<()> {
    let Some(store) = connect().await? else {
        return Ok(());
    };

    store.ping().await?;

    let email = format!("admin-{}@example.com", Uuid::new_v4());
    let admin = match store.insert_admin(&email, "$argon2id$stub").await? {
        InsertOutcome::Created(admin) => admin,
        InsertOutcome::Conflict => bail!("fresh email reported as conflict"),
    };
    assert_eq!(admin.email, email);

    let retry = store.insert_admin(&email, "$argon2id$other").await?;
    assert!(matches!(retry, InsertOutcome::Conflict));

    let found = store
        .find_admin_by_email(&email)
        .await?
        .context("registered admin not found")?;
    assert_eq!(found.id, admin.id);
    assert_eq!(found.password_hash, "$argon2id$stub");

    let upper = email.to_uppercase();
    assert!(store.find_admin_by_email(&upper).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn bot_config_is_a_single_row() -> Result<()> {
    let Some(store) = connect().await? else {
        return Ok(());
    };

    let email = format!("config-{}@example.com", Uuid::new_v4());
    let InsertOutcome::Created(admin) = store.insert_admin(&email, "$argon2id$stub").await? else {
        bail!("fresh email reported as conflict");
    };

    let first = store
        .save_bot_config(
            &BotConfigUpdate {
                bot_token: "123:first".to_string(),
                bot_prefix: "/".to_string(),
                bot_name: None,
            },
            admin.id,
        )
        .await?;

    let second = store
        .save_bot_config(
            &BotConfigUpdate {
                bot_token: "123:second".to_string(),
                bot_prefix: "!".to_string(),
                bot_name: Some("helper".to_string()),
            },
            admin.id,
        )
        .await?;

    assert_eq!(first.id, second.id);
    assert_eq!(second.bot_token, "123:second");
    assert_eq!(second.bot_prefix, "!");
    assert_eq!(second.bot_name.as_deref(), Some("helper"));
    assert_eq!(second.admin_id, Some(admin.id));

    let current = store.bot_config().await?.context("config not stored")?;
    assert_eq!(current.id, second.id);
    assert_eq!(current.bot_token, "123:second");

    // First saves racing on an empty table still end up as one row.
    let left = BotConfigUpdate {
        bot_token: "123:left".to_string(),
        bot_prefix: "/".to_string(),
        bot_name: None,
    };
    let right = BotConfigUpdate {
        bot_token: "123:right".to_string(),
        bot_prefix: "/".to_string(),
        bot_name: None,
    };
    for _ in 0..5 {
        sqlx::query("DELETE FROM bot_config")
            .execute(store.pool())
            .await?;

        let (saved_left, saved_right) = tokio::try_join!(
            store.save_bot_config(&left, admin.id),
            store.save_bot_config(&right, admin.id),
        )?;
        assert_eq!(saved_left.id, saved_right.id);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bot_config")
            .fetch_one(store.pool())
            .await?;
        assert_eq!(rows, 1);
    }

    Ok(())
}

#[tokio::test]
async fn bot_users_and_commands_are_managed() -> Result<()> {
    let Some(store) = connect().await? else {
        return Ok(());
    };

    let suffix = Uuid::new_v4().simple().to_string();
    let user_id = format!("tg-{suffix}");
    let command = format!("cmd_{suffix}");

    sqlx::query("INSERT INTO bot_users (user_id, username) VALUES ($1, $2)")
        .bind(&user_id)
        .bind("alice")
        .execute(store.pool())
        .await?;
    let command_id: i64 =
        sqlx::query_scalar("INSERT INTO commands (name, usage_count) VALUES ($1, $2) RETURNING id")
            .bind(&command)
            .bind(1_000_000_000_i64)
            .fetch_one(store.pool())
            .await?;

    let before = store.counters().await?;

    let banned = store
        .set_user_banned(&user_id, true)
        .await?
        .context("seeded user not found")?;
    assert!(banned.is_banned);
    assert!(store.set_user_banned("tg-missing", true).await?.is_none());

    let (users, total) = store.list_bot_users(Page { number: 1, limit: 1 }).await?;
    assert_eq!(users.len(), 1);
    assert!(total >= 1);

    let disabled = store
        .set_command_enabled(command_id, false)
        .await?
        .context("seeded command not found")?;
    assert!(!disabled.is_enabled);
    assert!(store.set_command_enabled(-1, false).await?.is_none());

    let after = store.counters().await?;
    assert_eq!(after.users_banned, before.users_banned + 1);
    assert_eq!(after.commands_enabled, before.commands_enabled - 1);
    assert_eq!(after.users_total, before.users_total);
    assert_eq!(after.commands_executed, before.commands_executed);
    assert!(after.commands_executed >= 1_000_000_000);

    let top = store.top_commands(5).await?;
    assert!(top.iter().any(|usage| usage.name == command));
    assert!(top.windows(2).all(|pair| pair[0].usage_count >= pair[1].usage_count));

    assert!(
        store
            .list_commands()
            .await?
            .iter()
            .any(|c| c.id == command_id && !c.is_enabled)
    );

    sqlx::query("DELETE FROM commands WHERE id = $1")
        .bind(command_id)
        .execute(store.pool())
        .await?;
    sqlx::query("DELETE FROM bot_users WHERE user_id = $1")
        .bind(&user_id)
        .execute(store.pool())
        .await?;

    Ok(())
}
