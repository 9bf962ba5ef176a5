//! API handlers for the dashboard.
//!
//! Everything except `auth`, `health` and `root` sits behind the route guard
//! and may take the verified [`auth::Principal`] as an extension.

pub mod auth;
pub mod commands;
pub mod config;
pub mod health;
pub mod root;
pub mod stats;
pub mod users;
