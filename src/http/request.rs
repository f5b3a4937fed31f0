//! Request-side helpers: identity headers and the access log.
//!
//! # Design Decisions
//! - Request ID is assigned by the outermost layer so every log line has it
//! - Tokens are never logged; only method, path, status, timing and client

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, HeaderName, Request},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::Instant;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Subject of the admitted principal, set for the upstream.
pub const X_PRINCIPAL_ID: HeaderName = HeaderName::from_static("x-principal-id");

/// Role of the admitted principal, set for the upstream.
pub const X_PRINCIPAL_ROLE: HeaderName = HeaderName::from_static("x-principal-role");

/// Connection-scoped headers that must not be forwarded.
const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove hop-by-hop headers and any caller-supplied identity headers.
pub fn sanitize_forwarded_headers(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove(X_PRINCIPAL_ID);
    headers.remove(X_PRINCIPAL_ROLE);
}

/// One structured line per request, emitted after the response is produced.
pub async fn access_log(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = header_str(request.headers(), X_REQUEST_ID).unwrap_or("unknown").to_string();
    let user_agent = header_str(request.headers(), header::USER_AGENT.as_str())
        .unwrap_or("-")
        .to_string();
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "-".to_string());

    let response = next.run(request).await;

    tracing::info!(
        request_id = %request_id,
        method = %method,
        url = %uri,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        client = %client,
        user_agent = %user_agent,
        "Request completed"
    );
    response
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
