//! # Database Models
//!
//! Structs that map to rows of the `snippets` and `users` tables.
//!
//! Timestamps are stored as RFC 3339 UTC strings with second precision and a
//! `Z` suffix (e.g. "2024-01-15T10:30:00Z"). With a single fixed format, string
//! comparison in SQL is the same as chronological comparison, which is what the
//! expiry filters rely on.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// A stored short text note with an expiry
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Snippet {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// When the snippet was created (RFC 3339 timestamp)
    pub created: String,
    /// When the snippet stops being visible (RFC 3339 timestamp)
    pub expires: String,
}

impl Snippet {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.expires)
    }
}

/// The part of a `users` row needed to check a login
///
/// `hashed_password` is an Argon2id PHC string, never the plaintext.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredentials {
    pub id: i64,
    pub hashed_password: String,
}

/// Current time in the storage format
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Timestamp `days` days from now, in the storage format
pub fn timestamp_in_days(days: i64) -> String {
    format_timestamp(Utc::now() + Duration::days(days))
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}
