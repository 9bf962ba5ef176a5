//! Auth handlers and supporting modules.
//!
//! Sessions are stateless: a successful login issues an HS256 token that
//! travels in the `auth_token` cookie, and the [`guard::route_guard`]
//! middleware verifies it before any protected handler runs.
//!
//! ## Limitations
//!
//! Logout only clears the cookie. A captured token stays valid until its
//! `exp`, since nothing is recorded server side.

pub(crate) mod guard;
pub(crate) mod login;
mod password;
pub(crate) mod principal;
pub(crate) mod register;
pub(crate) mod session;
mod state;
pub(crate) mod token;
pub(crate) mod types;
mod utils;

pub use guard::route_guard;
pub use principal::Principal;
pub use state::{AuthConfig, AuthState};
pub use token::{TokenError, TokenService};
