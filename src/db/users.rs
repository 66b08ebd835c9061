//! # User Database Operations
//!
//! Passwords are hashed with Argon2id before they reach the database and are
//! only ever compared through the hash.

use crate::db::models::{now_timestamp, UserCredentials};
use crate::error::{AppError, AppResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sqlx::SqlitePool;

/// Create a new user account
///
/// ## Errors
/// `DuplicateEmail` if the email address is already registered
pub async fn insert(pool: &SqlitePool, name: &str, email: &str, password: &str) -> AppResult<i64> {
    let hashed_password = hash_password(password)?;

    let result = sqlx::query(
        "INSERT INTO users (name, email, hashed_password, created)
         VALUES (?, ?, ?, ?)",
    )
    .bind(name)
    .bind(email)
    .bind(&hashed_password)
    .bind(now_timestamp())
    .execute(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::DuplicateEmail
        }
        _ => AppError::Database(e),
    })?;

    Ok(result.last_insert_rowid())
}

/// Check an email/password pair and return the user's id
///
/// An unknown email and a wrong password both yield `InvalidCredentials`, so
/// callers can't tell which one it was.
pub async fn authenticate(pool: &SqlitePool, email: &str, password: &str) -> AppResult<i64> {
    let user = sqlx::query_as::<_, UserCredentials>(
        "SELECT id, hashed_password FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(password, &user.hashed_password)? {
        return Err(AppError::InvalidCredentials);
    }

    Ok(user.id)
}

/// Whether a user row with this id currently exists
pub async fn exists(pool: &SqlitePool, id: i64) -> AppResult<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
        .bind(id)
        .fetch_one(pool)
        .await?;

    Ok(exists)
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
