//! Helpdesk API - AWS Lambda Runtime

use lambda_http::{run, Error};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use helpdesk_app::{body_limit_layer, build_cors_layer, connect_database, create_app};
use helpdesk_common::Config;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config =
        Config::from_env().map_err(|e| Error::from(format!("Configuration error: {}", e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.rust_log)),
        )
        .json()
        .without_time()
        .init();

    info!("Initializing Helpdesk API Lambda");

    let pool = connect_database(&config)
        .await
        .map_err(|e| Error::from(format!("Database error: {}", e)))?;

    info!("Database connection established");

    let app = create_app(pool)
        .await
        .map_err(|e| Error::from(format!("App initialization error: {}", e)))?;

    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(
            config.cors_allowed_origins.as_deref().unwrap_or_default(),
        ))
        .layer(body_limit_layer());

    info!("Helpdesk API Lambda ready to serve requests");

    run(app).await
}
