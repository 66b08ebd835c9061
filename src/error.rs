//! # Error Handling
//!
//! Custom error types for the application and their conversion into HTTP
//! responses.
//!
//! Handlers and middleware return [`AppResult`]. Anything that is the server's
//! fault is logged in full and answered with a bare "Internal Server Error";
//! the client never sees the underlying cause.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Application-wide error type
///
/// The first three variants are the model-level sentinels: handlers match on
/// them to turn an expected outcome (unknown snippet, wrong password, email
/// already taken) into a page instead of a server error.
#[derive(Error, Debug)]
pub enum AppError {
    /// No row matched the query (missing or expired snippet)
    #[error("models: no matching record found")]
    NoRecord,

    /// Unknown email address or wrong password
    #[error("models: invalid credentials")]
    InvalidCredentials,

    /// The email address is already registered
    #[error("models: duplicate email")]
    DuplicateEmail,

    /// Database errors (SQLx library errors)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Session store errors (load, save or serialization of session values)
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// The requested page does not exist (404)
    #[error("Not found")]
    NotFound,

    /// The client sent something we cannot process (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unexpected errors that shouldn't normally occur (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NoRecord | AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials
            | AppError::DuplicateEmail
            | AppError::Database(_)
            | AppError::Session(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = ?self, "{}", self);
        } else {
            tracing::debug!(%status, "client error: {}", self);
        }

        status_response(status)
    }
}

/// Plain-text response carrying only the canonical reason phrase
pub fn status_response(status: StatusCode) -> Response {
    let reason = status.canonical_reason().unwrap_or("Unknown Status");
    (status, reason.to_string()).into_response()
}

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;
