//! Helpdesk application composition root
//!
//! Wires the conversations domain to Postgres and the system clock and adds
//! the shared infrastructure routes and layers.

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use helpdesk_common::{Config, SystemClock};
use helpdesk_conversations::{ConversationsRepositories, ConversationsState};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer};
use tracing::{info, warn};

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Open the connection pool and apply pending migrations when enabled
pub async fn connect_database(config: &Config) -> Result<PgPool, anyhow::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| anyhow::anyhow!("Database connection failed: {}", e))?;

    if config.run_migrations {
        sqlx::migrate!("../../migrations").run(&pool).await?;
        info!("Database migrations applied");
    }

    Ok(pool)
}

/// Create the main application router backed by Postgres
pub async fn create_app(pool: PgPool) -> Result<Router, anyhow::Error> {
    let store = Arc::new(ConversationsRepositories::new(pool));
    let state = ConversationsState::new(store, Arc::new(SystemClock));

    Ok(build_router(state))
}

/// Compose the domain router with the shared infrastructure routes
pub fn build_router(state: ConversationsState) -> Router {
    Router::new()
        .route("/health", axum::routing::get(health_check))
        .route(
            "/",
            axum::routing::get(|| async { "Helpdesk API v0.0.1-SNAPSHOT" }),
        )
        .merge(helpdesk_conversations::routes().with_state(state))
}

/// CORS for a comma-separated origin list; permissive when none parse
pub fn build_cors_layer(origins: &str) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

/// Reject request bodies above `MAX_BODY_BYTES`
pub fn body_limit_layer() -> RequestBodyLimitLayer {
    RequestBodyLimitLayer::new(MAX_BODY_BYTES)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
