use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::{store::SharedStore, GIT_COMMIT_HASH};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    status: String,
    database: String,
    name: String,
    version: String,
    commit: String,
    timestamp: DateTime<Utc>,
}

#[utoipa::path(
    get,
    path= "/api/health",
    responses (
        (status = 200, description = "Database is reachable", body = Health),
        (status = 503, description = "Database is unreachable", body = Health)
    ),
    tag= "health"
)]
// axum handler for health
pub async fn health(store: Extension<SharedStore>) -> impl IntoResponse {
    let result = store.ping().await;
    if let Err(err) = &result {
        error!("Database health check failed: {err:#}");
    }

    let health = Health {
        status: if result.is_ok() { "healthy" } else { "unhealthy" }.to_string(),
        database: if result.is_ok() {
            "connected"
        } else {
            "disconnected"
        }
        .to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: GIT_COMMIT_HASH.to_string(),
        timestamp: Utc::now(),
    };

    let short_hash = health.commit.get(0..7).unwrap_or("");

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();

            headers.insert("X-App", x_app_header_value);

            headers
        })
        .unwrap_or_else(|err| {
            error!("Failed to parse X-App header: {}", err);
            HeaderMap::new()
        });

    let status = if result.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, headers, Json(health))
}
