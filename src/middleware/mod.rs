//! # Middleware Module
//!
//! Request interceptors, listed in the order a request meets them.
//!
//! Standard chain (every request, including static files and 404s):
//! - `recover`: turns a panic anywhere downstream into a 500 with `Connection: close`
//! - `logging`: one log line per request
//! - `headers`: fixed set of security response headers
//!
//! Dynamic chain (application pages), inside the session layer:
//! - `csrf`: double-submit token check on unsafe methods
//! - `auth::authenticate`: marks the request authenticated if the session user still exists
//! - `auth::require_authentication`: gate for routes that need a logged-in user

pub mod auth;
pub mod csrf;
pub mod headers;
pub mod logging;
pub mod recover;
