//! Map parsed CLI arguments to an [`Action`].

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, ARG_ASSETS_DIR, ARG_DB_MAX_CONNECTIONS};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;
    let db_max_connections = matches
        .get_one::<u32>(ARG_DB_MAX_CONNECTIONS)
        .copied()
        .unwrap_or(5);
    let assets_dir = matches
        .get_one::<String>(ARG_ASSETS_DIR)
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn: SecretString::from(dsn),
        db_max_connections,
        jwt_secret: auth_opts.jwt_secret,
        frontend_base_url: auth_opts.frontend_base_url,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        password_min_length: auth_opts.password_min_length,
        assets_dir,
    }))
}
