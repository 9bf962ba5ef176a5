use crate::{
    api::handlers::{
        auth::{self, AuthConfig, AuthState, TokenService},
        commands, config, health, root, stats, users,
    },
    store::{self, PgStore, SharedStore},
};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware,
    routing::{get, post},
    Extension, Router,
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    services::ServeDir,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;

pub mod error;
pub mod handlers;
mod openapi;

pub use openapi::openapi;


#[derive(Debug)]
pub struct DbConfig {
    pub dsn: SecretString,
    pub max_connections: u32,
}

/// Build the application router with the route guard and request layers.
///
/// When `assets_dir` is set, the dashboard build is served as the fallback
/// behind the same guard as the API.
///
/// # Errors
/// Returns an error if the frontend base URL cannot be turned into a CORS
/// origin.
pub fn app(
    auth_state: Arc<AuthState>,
    store: SharedStore,
    assets_dir: Option<&Path>,
) -> Result<Router> {
    let frontend_origin = frontend_origin(auth_state.config().frontend_base_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, ACCEPT])
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    let router = Router::new()
        .route("/", get(root::root))
        .route("/api/health", get(health::health))
        .route("/api/auth/register", post(auth::register::register))
        .route("/api/auth/login", post(auth::login::login))
        .route("/api/auth/check", get(auth::session::check))
        .route("/api/auth/logout", post(auth::session::logout))
        .route(
            "/api/config",
            get(config::get_config).post(config::save_config),
        )
        .route(
            "/api/users",
            get(users::list_users).put(users::update_user),
        )
        .route(
            "/api/commands",
            get(commands::list_commands).put(commands::update_command),
        )
        .route("/api/stats", get(stats::stats))
        .route("/api-docs/openapi.json", get(openapi::openapi_json));

    let router = match assets_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    // Layers wrap outside-in: CORS answers preflights before the guard runs.
    let app = router
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth::route_guard,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(auth_state))
                .layer(Extension(store)),
        );

    Ok(app)
}

/// Start the server
/// # Errors
/// Return error if the database is unreachable, the schema cannot be applied
/// or the listener fails
pub async fn new(
    port: u16,
    db: DbConfig,
    auth_config: AuthConfig,
    tokens: TokenService,
    assets_dir: Option<PathBuf>,
) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(db.max_connections)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(db.dsn.expose_secret())
        .await
        .context("Failed to connect to database")?;

    store::apply_schema(&pool)
        .await
        .context("Failed to apply database schema")?;

    let store: SharedStore = Arc::new(PgStore::new(pool));
    let auth_state = Arc::new(AuthState::new(auth_config, tokens));

    let app = app(auth_state, store, assets_dir.as_deref())?;

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}
