//! # Snippetbox
//!
//! Server-rendered snippet sharing: users sign up, log in, paste short text
//! snippets with an expiry and view them.
//!
//! Startup failures (configuration, database, migrations, binding the
//! listener) abort the process with the error logged.
//!
//! ## Timeouts
//! Each request is bounded by `REQUEST_TIMEOUT_SECS` (see [`routes::standard_chain`]),
//! which answers 408 once it runs out. `axum::serve` exposes no idle-connection
//! setting, so idle keep-alive connections are closed on hyper's defaults.

mod config;
mod db;
mod error;
mod forms;
mod handlers;
mod middleware;
mod routes;
mod state;
mod templates;
mod validator;

#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::state::AppState;
use std::net::SocketAddr;
use tower_sessions::session_store::ExpiredDeletion;
use tower_sessions_sqlx_store::SqliteStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired sessions are purged from the store
const SESSION_CLEANUP_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default: info level for most crates, debug level for our app
    // Can be overridden with RUST_LOG environment variable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,snippetbox=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded: {:?}", config);

    let db = db::connect(&config.database_url).await?;
    db::migrate(&db).await?;
    tracing::info!("Database ready");

    // Session data lives server-side in SQLite; the cookie only holds its id
    let session_store = SqliteStore::new(db.clone());
    session_store.migrate().await?;

    let cleanup_store = session_store.clone();
    tokio::spawn(async move {
        let interval = tokio::time::Duration::from_secs(SESSION_CLEANUP_INTERVAL_SECS);
        if let Err(e) = cleanup_store.continuously_delete_expired(interval).await {
            tracing::error!("Session cleanup task stopped: {:?}", e);
        }
    });

    let bind_addr = config.bind_address();
    let app_state = AppState::new(db, config);
    let app = routes::routes(app_state, session_store);

    tracing::info!("Starting server on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
