//! # Snippet Database Operations
//!
//! Expired snippets are never returned: every read filters on `expires`.

use crate::db::models::{now_timestamp, timestamp_in_days, Snippet};
use crate::error::{AppError, AppResult};
use sqlx::SqlitePool;

/// How many snippets the home page lists
pub const LATEST_LIMIT: i64 = 10;

/// Insert a new snippet that expires `expires_days` days from now
///
/// Returns the id of the new row.
pub async fn insert(
    pool: &SqlitePool,
    title: &str,
    content: &str,
    expires_days: i64,
) -> AppResult<i64> {
    let result = sqlx::query(
        "INSERT INTO snippets (title, content, created, expires)
         VALUES (?, ?, ?, ?)",
    )
    .bind(title)
    .bind(content)
    .bind(now_timestamp())
    .bind(timestamp_in_days(expires_days))
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Fetch a single non-expired snippet
///
/// ## Errors
/// `NoRecord` if the snippet doesn't exist or has expired
pub async fn get(pool: &SqlitePool, id: i64) -> AppResult<Snippet> {
    let snippet = sqlx::query_as::<_, Snippet>(
        "SELECT id, title, content, created, expires FROM snippets
         WHERE expires > ? AND id = ?",
    )
    .bind(now_timestamp())
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::RowNotFound => AppError::NoRecord,
        _ => AppError::Database(e),
    })?;

    Ok(snippet)
}

/// The most recently created non-expired snippets, newest first
///
/// `created` has one-second resolution, so snippets created in the same second
/// fall back to insertion order.
pub async fn latest(pool: &SqlitePool) -> AppResult<Vec<Snippet>> {
    let snippets = sqlx::query_as::<_, Snippet>(
        "SELECT id, title, content, created, expires FROM snippets
         WHERE expires > ?
         ORDER BY created DESC, id DESC
         LIMIT ?",
    )
    .bind(now_timestamp())
    .bind(LATEST_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(snippets)
}
