//! # Health Check Handler
//!
//! Liveness probe for load balancers and monitoring. It sits outside the
//! session and CSRF layers, so it touches neither the session store nor the
//! database.

/// GET /ping
pub async fn ping() -> &'static str {
    "OK"
}
