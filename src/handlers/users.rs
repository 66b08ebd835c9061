//! # User Handlers
//!
//! ## Routes
//! - GET/POST /user/signup   create an account (public)
//! - GET/POST /user/login    log in (public)
//! - POST /user/logout       log out (login required)
//!
//! Login and logout both renew the session id before changing the
//! authentication state, so a session id planted before login is useless
//! afterwards.

use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::forms::{UserLoginForm, UserSignupForm};
use crate::handlers::{PageContext, FLASH_KEY};
use crate::middleware::auth::AUTHENTICATED_USER_ID_KEY;
use crate::state::AppState;
use crate::templates;
use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use tower_sessions::Session;

/// Show the empty signup form
///
/// ## Route
/// GET /user/signup
pub async fn user_signup(page: PageContext) -> AppResult<Html<String>> {
    let data = page.template_data().await?;

    Ok(Html(templates::signup(&data, &UserSignupForm::default())))
}

/// Create an account from the submitted signup form
///
/// ## Route
/// POST /user/signup
///
/// ## How it works
/// 1. Decode the form body (a malformed body is a 400)
/// 2. Validate name, email and password, re-rendering with 422 on failure
/// 3. Insert the user; a taken email becomes a field error on the form
/// 4. Flash a confirmation and send the user to the login page
///
/// The new account is not logged in automatically.
pub async fn user_signup_post(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    form: Result<Form<UserSignupForm>, FormRejection>,
) -> AppResult<Response> {
    let Form(mut form) = form.map_err(|e| AppError::BadRequest(e.body_text()))?;

    if form.validate() {
        // The unique index on email is the source of truth for duplicates
        match users::insert(&state.db, &form.name, &form.email, &form.password).await {
            Ok(user_id) => {
                tracing::info!(user_id, "New user signed up");
                session
                    .insert(FLASH_KEY, "Your signup was successful. Please log in.")
                    .await?;
                return Ok(Redirect::to("/user/login").into_response());
            }
            Err(AppError::DuplicateEmail) => {
                form.validator
                    .add_field_error("email", "Email address is already in use");
            }
            Err(e) => return Err(e),
        }
    }

    // Re-render with the submitted values and the collected errors
    let data = page.template_data().await?;
    Ok((
        StatusCode::UNPROCESSABLE_ENTITY,
        Html(templates::signup(&data, &form)),
    )
        .into_response())
}

/// Show the empty login form
///
/// ## Route
/// GET /user/login
pub async fn user_login(page: PageContext) -> AppResult<Html<String>> {
    let data = page.template_data().await?;

    Ok(Html(templates::login(&data, &UserLoginForm::default())))
}

/// Check the submitted credentials and log the user in
///
/// ## Route
/// POST /user/login
///
/// ## How it works
/// 1. Validate that email and password were supplied
/// 2. Look the credentials up; any mismatch is one generic error
/// 3. Renew the session id, then store the user's id in the session
/// 4. Redirect to the snippet form
pub async fn user_login_post(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    form: Result<Form<UserLoginForm>, FormRejection>,
) -> AppResult<Response> {
    let Form(mut form) = form.map_err(|e| AppError::BadRequest(e.body_text()))?;

    if form.validate() {
        match users::authenticate(&state.db, &form.email, &form.password).await {
            Ok(user_id) => {
                // New id first, so the pre-login id never carries the login
                session.cycle_id().await?;
                session.insert(AUTHENTICATED_USER_ID_KEY, user_id).await?;
                tracing::info!(user_id, "User logged in");
                return Ok(Redirect::to("/snippet/create").into_response());
            }
            Err(AppError::InvalidCredentials) => {
                // Same message for unknown email and wrong password
                form.validator
                    .add_non_field_error("Email or password is incorrect");
            }
            Err(e) => return Err(e),
        }
    }

    let data = page.template_data().await?;
    Ok((
        StatusCode::UNPROCESSABLE_ENTITY,
        Html(templates::login(&data, &form)),
    )
        .into_response())
}

/// Log the current user out
///
/// ## Route
/// POST /user/logout (login required)
///
/// The session itself survives with a fresh id, since it carries the flash
/// message to the home page.
pub async fn user_logout_post(session: Session) -> AppResult<Redirect> {
    session.cycle_id().await?;
    session.remove::<i64>(AUTHENTICATED_USER_ID_KEY).await?;
    session
        .insert(FLASH_KEY, "You've been logged out successfully!")
        .await?;

    Ok(Redirect::to("/"))
}
