use crate::api::{
    self,
    handlers::auth::{AuthConfig, TokenService},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub db_max_connections: u32,
    pub jwt_secret: SecretString,
    pub frontend_base_url: String,
    pub session_ttl_seconds: i64,
    pub password_min_length: usize,
    pub assets_dir: Option<PathBuf>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the token service cannot be built, the database is
/// unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let tokens = TokenService::new(&args.jwt_secret, args.session_ttl_seconds)
        .context("Invalid session token configuration")?;

    let auth_config = AuthConfig::new(args.frontend_base_url)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_password_min_length(args.password_min_length);

    debug!(?auth_config, ?tokens, "Auth configuration");

    let db = api::DbConfig {
        dsn: args.dsn,
        max_connections: args.db_max_connections,
    };

    api::new(args.port, db, auth_config, tokens, args.assets_dir).await
}
