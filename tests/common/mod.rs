//! Shared utilities for integration testing.

#![allow(dead_code)]

use axum::{http::HeaderMap, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

use gatekeeper::auth::token::SigningKey;
use gatekeeper::auth::{Role, TokenIssuer};
use gatekeeper::config::{GatewayConfig, RateLimitConfig, RouteConfig};
use gatekeeper::http::HttpServer;
use gatekeeper::lifecycle::Shutdown;

pub const SECRET: &str = "integration-secret";

/// Start a mock upstream that echoes the path and the identity headers it saw.
pub async fn start_echo_upstream() -> SocketAddr {
    async fn echo(uri: axum::http::Uri, headers: HeaderMap) -> Json<Value> {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
        Json(json!({
            "path": uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/"),
            "principal_id": header("x-principal-id"),
            "principal_role": header("x-principal-role"),
            "authorization": header("authorization"),
        }))
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(echo);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start a mock upstream that waits `delay` before answering.
pub async fn start_slow_upstream(delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        "late"
    });
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// An address with nothing listening on it.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A config mirroring the default route table, pointed at `upstream`, with
/// `max_requests` per window for both limiters.
pub fn test_config(upstream: SocketAddr, max_requests: u32) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    let limit = RateLimitConfig {
        max_requests,
        window_secs: 60,
    };
    config.rate_limits.insert("auth".into(), limit.clone());
    config.rate_limits.insert("api".into(), limit);
    for route in &mut config.routes {
        route.upstream = upstream.to_string();
    }
    config
}

/// Add an unlimited public route.
pub fn with_open_route(mut config: GatewayConfig, prefix: &str, upstream: SocketAddr) -> GatewayConfig {
    config.routes.push(RouteConfig {
        name: "open".into(),
        path_prefix: prefix.into(),
        rate_limit: None,
        authenticate: false,
        roles: None,
        upstream: upstream.to_string(),
    });
    config
}

/// Run a gateway on an ephemeral port. The returned `Shutdown` stops it.
pub async fn start_gateway(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, SigningKey::new(SECRET)).unwrap();
    let shutdown = Shutdown::new();
    tokio::spawn(server.run(listener, shutdown.clone()));
    tokio::time::sleep(Duration::from_millis(20)).await;
    (addr, shutdown)
}

pub fn token(subject: &str, role: Role) -> String {
    TokenIssuer::new(SigningKey::new(SECRET))
        .issue(subject, role, Duration::from_secs(3600))
        .unwrap()
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}
