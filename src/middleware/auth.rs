//! # Authentication Middleware
//!
//! Two layers cooperate:
//! - [`authenticate`] runs on every page and turns the session's user id into
//!   the [`Authenticated`] request extension
//! - [`require_authentication`] is a route layer on the protected routes only
//!
//! Handlers read the result through the [`AuthStatus`] extractor instead of
//! looking at the session themselves.

use crate::db::users;
use crate::error::AppResult;
use crate::state::AppState;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::convert::Infallible;
use tower_sessions::Session;

/// Session key holding the logged-in user's id
pub const AUTHENTICATED_USER_ID_KEY: &str = "authenticatedUserID";

/// Marker placed in the request extensions by [`authenticate`]
///
/// Its presence means the session's user row existed when this request was
/// checked. It is recomputed on every request and never stored.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated;

/// Whether the current request is authenticated
pub struct AuthStatus(pub bool);

impl<S> FromRequestParts<S> for AuthStatus
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(AuthStatus(parts.extensions.get::<Authenticated>().is_some()))
    }
}

/// Resolve the session's user into the [`Authenticated`] marker
///
/// A session user id that no longer matches a row leaves the request
/// unauthenticated but keeps the session value as is, so the check repeats on
/// the next request.
pub async fn authenticate(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    // Missing key and a zero id both mean "nobody logged in"
    let user_id = session
        .get::<i64>(AUTHENTICATED_USER_ID_KEY)
        .await?
        .unwrap_or(0);

    if user_id == 0 {
        return Ok(next.run(request).await);
    }

    // A failed lookup is a 500 and the handler never runs
    if users::exists(&state.db, user_id).await? {
        request.extensions_mut().insert(Authenticated);
    } else {
        tracing::debug!(user_id, "Session refers to a user that no longer exists");
    }

    Ok(next.run(request).await)
}

/// Redirect anonymous requests to the login page
///
/// Pages behind this gate are marked `Cache-Control: no-store` so they don't
/// linger in shared or browser caches after logout.
pub async fn require_authentication(
    AuthStatus(is_authenticated): AuthStatus,
    request: Request,
    next: Next,
) -> Response {
    if !is_authenticated {
        return Redirect::to("/user/login").into_response();
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .append(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
