//! # Configuration Management
//!
//! Configuration is loaded from environment variables (12-factor style), with an
//! optional `.env` file for local development.
//!
//! ## Environment Variables
//! - `HOST`: Server bind address (default: 127.0.0.1)
//! - `PORT`: Server port (default: 4000)
//! - `DATABASE_URL`: SQLite connection string (required)
//! - `STATIC_DIR`: Directory served under `/static` (default: ./ui/static)
//! - `COOKIE_SECURE`: Mark session and CSRF cookies `Secure` (default: true)
//! - `REQUEST_TIMEOUT_SECS`: Per-request timeout in seconds (default: 10)

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
///
/// Built once at startup and handed to [`crate::state::AppState`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host/IP address to bind to
    pub host: String,

    /// Server port number
    pub port: u16,

    /// SQLite database connection URL
    /// Format: "sqlite:snippetbox.db?mode=rwc"
    pub database_url: String,

    /// Directory holding CSS, images and other static assets
    pub static_dir: PathBuf,

    /// Whether cookies carry the `Secure` attribute
    ///
    /// Browsers drop `Secure` cookies received over plain HTTP (except on
    /// localhost), so this is switched off when running without TLS.
    pub cookie_secure: bool,

    /// Upper bound on the time spent handling a single request
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// `DATABASE_URL` has no default: a missing value is a startup error, as is
    /// any value that fails to parse.
    ///
    /// ## Example .env file
    /// ```text
    /// HOST=127.0.0.1
    /// PORT=4000
    /// DATABASE_URL=sqlite:snippetbox.db?mode=rwc
    /// COOKIE_SECURE=false
    /// ```
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (dotenvy doesn't error if file missing)
        dotenvy::dotenv().ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from any variable source
    ///
    /// `from_env` passes the process environment; tests pass a map.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = lookup("PORT")
            .unwrap_or_else(|| "4000".to_string())
            .parse()
            .context("PORT must be a valid port number")?;

        // No default: the app has nowhere sensible to put its data
        let database_url =
            lookup("DATABASE_URL").context("DATABASE_URL environment variable is not set")?;

        // Secure cookies unless explicitly switched off
        let cookie_secure = match lookup("COOKIE_SECURE") {
            Some(value) => parse_bool(&value)
                .with_context(|| format!("COOKIE_SECURE has an invalid value '{}'", value))?,
            None => true,
        };

        let request_timeout = lookup("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .map(Duration::from_secs)
            .context("REQUEST_TIMEOUT_SECS must be a whole number of seconds")?;

        Ok(Config {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            database_url,
            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./ui/static")),
            cookie_secure,
            request_timeout,
        })
    }

    /// Get the socket address to bind the server to, e.g. "127.0.0.1:4000"
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
