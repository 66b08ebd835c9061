use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

/// Log remote address, protocol, method and URI of every request
///
/// The remote address is only known when the server was started with
/// `into_make_service_with_connect_info`; otherwise "-" is logged.
pub async fn log_request(request: Request, next: Next) -> Response {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());

    tracing::info!(
        "{} - {:?} {} {}",
        remote_addr,
        request.version(),
        request.method(),
        request.uri()
    );

    next.run(request).await
}
