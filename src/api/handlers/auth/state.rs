//! Auth state and configuration.

use super::token::TokenService;

pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
pub const DEFAULT_PASSWORD_MIN_LENGTH: usize = 6;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    session_ttl_seconds: i64,
    password_min_length: usize,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            password_min_length: DEFAULT_PASSWORD_MIN_LENGTH,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_password_min_length(mut self, length: usize) -> Self {
        self.password_min_length = length;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn password_min_length(&self) -> usize {
        self.password_min_length
    }

    /// Cookies only get `Secure` when the dashboard is served over HTTPS.
    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

#[derive(Debug)]
pub struct AuthState {
    config: AuthConfig,
    tokens: TokenService,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, tokens: TokenService) -> Self {
        Self { config, tokens }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }
}
