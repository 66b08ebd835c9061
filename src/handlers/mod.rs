//! # HTTP Request Handlers
//!
//! - `health`: liveness probe
//! - `snippets`: home page, snippet view and the create form
//! - `users`: signup, login and logout
//!
//! Page handlers take a [`PageContext`] and only turn it into
//! [`TemplateData`] when they actually render, because building the data
//! consumes the one-shot flash message from the session.

pub mod health;
pub mod snippets;
pub mod users;

use crate::error::{status_response, AppError, AppResult};
use crate::middleware::auth::AuthStatus;
use crate::middleware::csrf::CsrfToken;
use crate::templates::TemplateData;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::Response,
};
use chrono::{Datelike, Utc};
use tower_sessions::Session;

/// Session key for the one-time message shown on the next rendered page
pub const FLASH_KEY: &str = "flash";

/// Everything a page handler needs to build [`TemplateData`]
pub struct PageContext {
    session: Session,
    is_authenticated: bool,
    csrf_token: CsrfToken,
}

impl PageContext {
    /// Build the common template data, popping the flash message
    pub async fn template_data(&self) -> AppResult<TemplateData> {
        let flash = self.session.remove::<String>(FLASH_KEY).await?;

        Ok(TemplateData {
            current_year: Utc::now().year(),
            flash,
            is_authenticated: self.is_authenticated,
            csrf_token: self.csrf_token.as_str().to_string(),
        })
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, message)| AppError::Internal(message.to_string()))?;
        let AuthStatus(is_authenticated) = match AuthStatus::from_request_parts(parts, state).await {
            Ok(status) => status,
            Err(never) => match never {},
        };
        let csrf_token = CsrfToken::from_request_parts(parts, state).await?;

        Ok(PageContext {
            session,
            is_authenticated,
            csrf_token,
        })
    }
}

/// Fallback for unmatched routes
pub async fn not_found() -> Response {
    status_response(StatusCode::NOT_FOUND)
}
