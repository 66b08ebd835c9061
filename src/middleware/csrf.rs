//! # CSRF Protection
//!
//! Double-submit cookie scheme. A random base token lives in an `HttpOnly`
//! cookie; pages embed a masked copy of it in their forms, and every unsafe
//! request must send one back (form field or header) that unmasks to the
//! cookie's token.
//!
//! Masking XORs the token with a fresh one-time pad and prepends the pad, so
//! the string in the page changes on every render while still verifying
//! against the same cookie. Raw unmasked tokens are accepted too.

use crate::error::{status_response, AppError};
use crate::state::AppState;
use axum::{
    body::{to_bytes, Body},
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use base64::prelude::*;
use rand::{rngs::OsRng, RngCore};
use tower_sessions::cookie::Cookie;

pub const CSRF_COOKIE_NAME: &str = "csrf_token";
pub const CSRF_FORM_FIELD: &str = "csrf_token";
pub const CSRF_HEADER_NAME: &str = "x-csrf-token";

const TOKEN_LEN: usize = 32;
const COOKIE_MAX_AGE_DAYS: i64 = 365;
/// Largest form body buffered while looking for the token
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Masked token for the current request, ready to embed in a form
#[derive(Debug, Clone)]
pub struct CsrfToken(String);

impl CsrfToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CsrfToken>()
            .cloned()
            .ok_or_else(|| AppError::Internal("CSRF layer is not installed on this route".into()))
    }
}

/// Verify the token on unsafe methods and issue the base cookie
///
/// Failed checks are answered with 400 Bad Request and never reach the
/// wrapped handler.
pub async fn protect(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let secure = state.config.cookie_secure;
    let (mut parts, body) = request.into_parts();

    let (base_token, issue_cookie) = match cookie_token(&parts.headers) {
        Some(token) => (token, false),
        None => (generate_token(), true),
    };

    let body = if is_safe_method(&parts.method) {
        body
    } else {
        let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to read request body for CSRF check: {}", e);
                return failure(&base_token, issue_cookie, secure);
            }
        };

        // A freshly issued cookie can't have been seen by the client yet
        let verified = !issue_cookie
            && sent_token(&parts.headers, &bytes)
                .is_some_and(|sent| verify_token(&base_token, &sent));

        if !verified {
            tracing::warn!(method = %parts.method, uri = %parts.uri, "CSRF token verification failed");
            return failure(&base_token, issue_cookie, secure);
        }

        Body::from(bytes)
    };

    parts.extensions.insert(CsrfToken(mask_token(&base_token)));

    let mut response = next.run(Request::from_parts(parts, body)).await;
    finish_response(response.headers_mut(), &base_token, issue_cookie, secure);
    response
}

fn failure(base_token: &[u8], issue_cookie: bool, secure: bool) -> Response {
    let mut response = status_response(StatusCode::BAD_REQUEST);
    finish_response(response.headers_mut(), base_token, issue_cookie, secure);
    response
}

fn finish_response(headers: &mut HeaderMap, base_token: &[u8], issue_cookie: bool, secure: bool) {
    headers.append(header::VARY, HeaderValue::from_static("Cookie"));

    if issue_cookie {
        match HeaderValue::from_str(&base_cookie(base_token, secure).to_string()) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!("Failed to encode CSRF cookie: {}", e),
        }
    }
}

fn base_cookie(token: &[u8], secure: bool) -> Cookie<'static> {
    Cookie::build((CSRF_COOKIE_NAME, BASE64_STANDARD.encode(token)))
        .http_only(true)
        .path("/")
        .secure(secure)
        .max_age(time::Duration::days(COOKIE_MAX_AGE_DAYS))
        .build()
}

fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Base token from the request's cookie, if present and well formed
fn cookie_token(headers: &HeaderMap) -> Option<Vec<u8>> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == CSRF_COOKIE_NAME)
        .and_then(|cookie| BASE64_STANDARD.decode(cookie.value()).ok())
        .filter(|token| token.len() == TOKEN_LEN)
}

/// Token sent by the client: header first, then the urlencoded form field
fn sent_token(headers: &HeaderMap, body: &[u8]) -> Option<Vec<u8>> {
    let encoded = match headers.get(CSRF_HEADER_NAME) {
        Some(value) => value.to_str().ok()?.to_string(),
        None => {
            let is_form = headers
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));
            if !is_form {
                return None;
            }
            serde_urlencoded::from_bytes::<Vec<(String, String)>>(body)
                .ok()?
                .into_iter()
                .find(|(key, _)| key == CSRF_FORM_FIELD)
                .map(|(_, value)| value)?
        }
    };

    BASE64_STANDARD.decode(encoded.trim()).ok()
}

fn generate_token() -> Vec<u8> {
    let mut token = vec![0u8; TOKEN_LEN];
    OsRng.fill_bytes(&mut token);
    token
}

fn mask_token(token: &[u8]) -> String {
    let mut pad = vec![0u8; TOKEN_LEN];
    OsRng.fill_bytes(&mut pad);

    let mut masked = pad.clone();
    masked.extend(token.iter().zip(&pad).map(|(t, p)| t ^ p));
    BASE64_STANDARD.encode(masked)
}

fn verify_token(base_token: &[u8], sent: &[u8]) -> bool {
    let candidate: Vec<u8> = match sent.len() {
        n if n == TOKEN_LEN * 2 => {
            let (pad, masked) = sent.split_at(TOKEN_LEN);
            masked.iter().zip(pad).map(|(m, p)| m ^ p).collect()
        }
        TOKEN_LEN => sent.to_vec(),
        _ => return false,
    };
    constant_time_eq(base_token, &candidate)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
