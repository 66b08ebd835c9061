//! # Router
//!
//! Builds the complete request pipeline once at startup:
//!
//! ```text
//! recover_panic -> log_request -> secure_headers -> timeout -> router
//!   /static/*     ServeDir (no session, no auth)
//!   /ping         health check
//!   pages         session -> csrf -> authenticate -> [require_authentication] -> handler
//!   (unmatched)   404
//! ```

use crate::handlers::health::ping;
use crate::handlers::not_found;
use crate::handlers::snippets::{home, snippet_create, snippet_create_post, snippet_view};
use crate::handlers::users::{
    user_login, user_login_post, user_logout_post, user_signup, user_signup_post,
};
use crate::middleware::auth::{authenticate, require_authentication};
use crate::middleware::csrf;
use crate::middleware::headers::secure_headers;
use crate::middleware::logging::log_request;
use crate::middleware::recover::handle_panic;
use crate::state::AppState;
use axum::{
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir, timeout::TimeoutLayer};
use tower_sessions::{cookie::SameSite, Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

/// Name of the session cookie
pub const SESSION_COOKIE_NAME: &str = "session";

/// Sessions expire 12 hours after they were last saved
const SESSION_LIFETIME_HOURS: i64 = 12;

/// Build the application router with every middleware in place
pub fn routes(state: AppState, session_store: SqliteStore) -> Router {
    let session_layer = SessionManagerLayer::new(session_store)
        .with_name(SESSION_COOKIE_NAME)
        .with_secure(state.config.cookie_secure)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(
            SESSION_LIFETIME_HOURS,
        )));

    let public = Router::new()
        .route("/", get(home))
        .route("/snippet/view/{id}", get(snippet_view))
        .route("/user/signup", get(user_signup).post(user_signup_post))
        .route("/user/login", get(user_login).post(user_login_post));

    let protected = Router::new()
        .route(
            "/snippet/create",
            get(snippet_create).post(snippet_create_post),
        )
        .route("/user/logout", post(user_logout_post))
        .route_layer(from_fn(require_authentication));

    // Layers wrap what was added before them: the session layer added last is
    // the outermost, so CSRF and authenticate both see a loaded session.
    let pages = public
        .merge(protected)
        .layer(from_fn_with_state(state.clone(), authenticate))
        .layer(from_fn_with_state(state.clone(), csrf::protect))
        .layer(session_layer)
        .with_state(state.clone());

    let router = Router::new()
        .route("/ping", get(ping))
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .merge(pages)
        .fallback(not_found);

    standard_chain(router, state.config.request_timeout)
}

/// Wrap a router in the middleware every response goes through
///
/// `CatchPanicLayer` is added last so it is outermost and also covers panics
/// raised by the other layers.
pub fn standard_chain(router: Router, request_timeout: Duration) -> Router {
    router
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(from_fn(secure_headers))
        .layer(from_fn(log_request))
        .layer(CatchPanicLayer::custom(handle_panic))
}
