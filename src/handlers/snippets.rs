//! # Snippet Handlers
//!
//! ## Routes
//! - GET /                    latest snippets (public)
//! - GET /snippet/view/{id}   single snippet (public)
//! - GET /snippet/create      create form (login required)
//! - POST /snippet/create     create submission (login required)

use crate::db::snippets;
use crate::error::{AppError, AppResult};
use crate::forms::SnippetCreateForm;
use crate::handlers::{PageContext, FLASH_KEY};
use crate::state::AppState;
use crate::templates;
use axum::{
    extract::{rejection::FormRejection, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use tower_sessions::Session;

/// Home page listing the latest snippets
///
/// ## Route
/// GET /
pub async fn home(State(state): State<AppState>, page: PageContext) -> AppResult<Html<String>> {
    let snippets = snippets::latest(&state.db).await?;
    let data = page.template_data().await?;

    Ok(Html(templates::home(&data, &snippets)))
}

/// Show one snippet
///
/// ## Route
/// GET /snippet/view/{id}
///
/// Ids that are not positive integers are treated like unknown ones, and an
/// expired snippet is as good as missing: all of them answer 404.
pub async fn snippet_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
    page: PageContext,
) -> AppResult<Html<String>> {
    // Parse by hand so a bad id is a 404 rather than Path's 400
    let id: i64 = match id.parse() {
        Ok(id) if id >= 1 => id,
        _ => return Err(AppError::NotFound),
    };

    let snippet = snippets::get(&state.db, id).await?;
    let data = page.template_data().await?;

    Ok(Html(templates::view(&data, &snippet)))
}

pub async fn snippet_create(page: PageContext) -> AppResult<Html<String>> {
    let data = page.template_data().await?;

    Ok(Html(templates::create(&data, &SnippetCreateForm::default())))
}

/// Store a new snippet
///
/// ## Route
/// POST /snippet/create (login required)
///
/// ## How it works
/// 1. Decode the form; an `expires` that isn't a number is a 400
/// 2. Validate title, content and expiry, re-rendering with 422 on failure
/// 3. Insert the snippet, flash a confirmation and redirect to its page
pub async fn snippet_create_post(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    form: Result<Form<SnippetCreateForm>, FormRejection>,
) -> AppResult<Response> {
    let Form(mut form) = form.map_err(|e| AppError::BadRequest(e.body_text()))?;

    if !form.validate() {
        let data = page.template_data().await?;
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(templates::create(&data, &form)),
        )
            .into_response());
    }

    let id = snippets::insert(&state.db, &form.title, &form.content, form.expires).await?;
    tracing::debug!(snippet_id = id, "Snippet created");

    session
        .insert(FLASH_KEY, "Snippet successfully created!")
        .await?;

    Ok(Redirect::to(&format!("/snippet/view/{}", id)).into_response())
}
