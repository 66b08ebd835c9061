//! # Database Module
//!
//! - `models`: Row structs (Snippet, UserCredentials) and timestamp helpers
//! - `snippets`: Snippet queries (insert, get, latest)
//! - `users`: User queries (insert, authenticate, exists)
//!
//! Each table gets its own module of free functions taking the shared
//! `SqlitePool`.

pub mod models;
pub mod snippets;
pub mod users;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

/// Open the connection pool and verify the database answers
///
/// `connect` establishes (and so pings) the first connection, so an unreachable
/// or unopenable database fails here, at startup.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new().connect(database_url).await
}

/// Apply the embedded migrations from ./migrations
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Fresh in-memory database with the schema applied
///
/// Every connection to `sqlite::memory:` is a separate database, so the pool is
/// pinned to a single connection.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    migrate(&pool).await.expect("migrations apply");
    pool
}
