pub mod auth;
pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_ASSETS_DIR: &str = "assets-dir";
pub const ARG_DB_MAX_CONNECTIONS: &str = "db-max-connections";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("botdash")
        .about("Admin dashboard API for Telegram bots")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("BOTDASH_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .env("BOTDASH_DSN")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_DB_MAX_CONNECTIONS)
                .long(ARG_DB_MAX_CONNECTIONS)
                .help("Maximum number of pooled database connections")
                .env("BOTDASH_DB_MAX_CONNECTIONS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_ASSETS_DIR)
                .long(ARG_ASSETS_DIR)
                .help("Directory with the built dashboard, served behind the route guard")
                .env("BOTDASH_ASSETS_DIR"),
        );

    let command = auth::with_args(command);
    logging::with_args(command)
}
