use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::api::handlers::auth::token::MIN_SECRET_BYTES;

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_PASSWORD_MIN_LENGTH: &str = "password-min-length";

pub struct Options {
    pub jwt_secret: SecretString,
    pub frontend_base_url: String,
    pub session_ttl_seconds: i64,
    pub password_min_length: usize,
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("jwt_secret", &"***")
            .field("frontend_base_url", &self.frontend_base_url)
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .field("password_min_length", &self.password_min_length)
            .finish()
    }
}

impl Options {
    /// Parse auth arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the JWT secret is missing or shorter than
    /// [`MIN_SECRET_BYTES`].
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let jwt_secret = matches
            .get_one::<String>(ARG_JWT_SECRET)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_JWT_SECRET}"))?;
        if jwt_secret.len() < MIN_SECRET_BYTES {
            anyhow::bail!("--{ARG_JWT_SECRET} must be at least {MIN_SECRET_BYTES} bytes");
        }

        Ok(Self {
            jwt_secret: SecretString::from(jwt_secret.clone()),
            frontend_base_url: matches
                .get_one::<String>(ARG_FRONTEND_BASE_URL)
                .cloned()
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(604_800),
            password_min_length: matches
                .get_one::<usize>(ARG_PASSWORD_MIN_LENGTH)
                .copied()
                .unwrap_or(6),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Secret used to sign session tokens (at least 32 bytes)")
                .env("BOTDASH_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Public dashboard URL, used for CORS and the cookie Secure flag")
                .env("BOTDASH_FRONTEND_BASE_URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session token and cookie TTL in seconds")
                .env("BOTDASH_SESSION_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_PASSWORD_MIN_LENGTH)
                .long(ARG_PASSWORD_MIN_LENGTH)
                .help("Minimum password length accepted at registration")
                .env("BOTDASH_PASSWORD_MIN_LENGTH")
                .default_value("6")
                .value_parser(clap::value_parser!(usize)),
        )
}
