//! # Botdash (Telegram bot admin dashboard API)
//!
//! `botdash` is the server side of a dashboard used to administer a Telegram
//! bot. It owns administrator accounts, session authentication and the JSON
//! endpoints the dashboard screens call for bot configuration, bot users and
//! bot commands.
//!
//! ## Sessions
//!
//! A successful login issues an HS256-signed token carrying the administrator
//! id, issue time and expiry (7 days by default). The token travels in the `auth_token`
//! cookie (`HttpOnly`, `SameSite=Lax`, `Secure` behind https). Nothing about a
//! session is stored server-side: validity is signature plus expiry only.
//!
//! > **Note:** Logout clears the cookie but cannot revoke a copied token; it
//! > stays valid until it expires.
//!
//! ## Route guard
//!
//! Every request goes through [`api::handlers::auth::guard`]. Paths on a small
//! allow-list pass untouched; everything else needs a valid session. Rejected
//! API requests get `401` JSON, rejected browser navigation is redirected to
//! `/login`.

pub mod api;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
