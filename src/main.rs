mod aggregator;
mod config;
mod db;
mod error;
mod models;
mod routes;
mod state;
mod store;
mod subscription;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use db::MySqlStore;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "comic_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let pool = db::init_db(
        &config.database_url,
        config.db_max_connections,
        config.admin_username.as_deref(),
    )
    .await?;
    tracing::info!("Database initialized");

    let state = AppState::new(
        Arc::new(MySqlStore::new(pool)),
        config.fan_out.clone(),
        &config.secret_key,
    );
    tracing::info!(
        concurrency = config.fan_out.concurrency,
        timeout_ms = config.fan_out.timeout.as_millis() as u64,
        on_failure = ?config.fan_out.on_failure,
        "View fan-out configured"
    );

    let app = routes::app(state);

    tracing::info!("Server running on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
