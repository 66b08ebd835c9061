//! # Application State
//!
//! The single dependency bag shared by every handler and middleware. It is
//! built once at startup and cloned into each request by axum; every field is
//! cheap to clone and safe to share across tasks.

use crate::config::Config;
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;

/// Shared application state
///
/// The session manager is not stored here: it lives in the router as a layer
/// and reaches handlers through the `Session` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool backing the snippet and user queries
    pub db: SqlitePool,

    /// Startup configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: Config) -> Self {
        AppState {
            db,
            config: Arc::new(config),
        }
    }
}
