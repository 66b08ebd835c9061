use crate::error::status_response;
use crate::middleware::headers::set_security_headers;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use std::any::Any;

/// Response for a request whose handling panicked
///
/// Used with `CatchPanicLayer::custom` as the outermost layer. The panic
/// unwound through `secure_headers`, so the headers are applied again here.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = err.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = err.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %detail, "Recovered from panic while handling request");

    let mut response = status_response(StatusCode::INTERNAL_SERVER_ERROR);
    let headers = response.headers_mut();
    headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
    set_security_headers(headers);
    response
}
