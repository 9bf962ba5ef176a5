use axum::Json;
use utoipa::{
    openapi::{Contact, InfoBuilder, License},
    OpenApi,
};

use super::handlers::{auth, commands, config, health, root, stats, users};

#[derive(OpenApi)]
#[openapi(
    paths(
        root::root,
        health::health,
        auth::register::register,
        auth::login::login,
        auth::session::check,
        auth::session::logout,
        config::get_config,
        config::save_config,
        users::list_users,
        users::update_user,
        commands::list_commands,
        commands::update_command,
        stats::stats,
    ),
    tags(
        (name = "health", description = "Liveness and build information"),
        (name = "auth", description = "Administrator registration and cookie sessions"),
        (name = "config", description = "Bot configuration"),
        (name = "users", description = "Bot users and bans"),
        (name = "commands", description = "Bot commands"),
        (name = "stats", description = "Dashboard counters")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    // Use Cargo.toml metadata instead of the utoipa crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();
    info.contact = cargo_contact();
    info.license = cargo_license();
    doc.info = info;
    doc
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi())
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    Some(value.trim()).filter(|trimmed| !trimmed.is_empty())
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, email)) => {
            let name = name.trim();
            let email = email.trim_end_matches('>').trim();
            (
                (!name.is_empty()).then_some(name),
                (!email.is_empty()).then_some(email),
            )
        }
        None => {
            let name = author.trim();
            ((!name.is_empty()).then_some(name), None)
        }
    }
}
