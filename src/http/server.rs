//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, access log, timeout, body limit)
//! - Build the named rate limiters and the route table
//! - Normalize the path, then run the request through its route group's gate
//! - Forward admitted requests to the group's upstream
//! - Run the rate window sweeper alongside the server

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request, StatusCode, Uri, Version},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::token::SigningKey;
use crate::auth::{Principal, TokenVerifier};
use crate::config::GatewayConfig;
use crate::http::request::{access_log, sanitize_forwarded_headers, X_PRINCIPAL_ID, X_PRINCIPAL_ROLE};
use crate::http::response;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::routing::matcher::normalize_path;
use crate::routing::router::{RouteError, RouteGroup, RouteTable};
use crate::security::sweeper::WindowSweeper;
use crate::security::{IdentifierSource, RateLimiter, RatePolicy};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub client: Client<HttpConnector, Body>,
    pub started: Instant,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    limiters: Vec<Arc<RateLimiter>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and secret.
    pub fn new(config: GatewayConfig, key: SigningKey) -> Result<Self, RouteError> {
        let limiters: BTreeMap<String, Arc<RateLimiter>> = config
            .rate_limits
            .iter()
            .map(|(name, limit)| {
                let limiter = Arc::new(RateLimiter::new(name.as_str(), RatePolicy::from(limit)));
                (name.clone(), limiter)
            })
            .collect();

        let verifier = Arc::new(
            TokenVerifier::new(key).with_leeway(Duration::from_secs(config.auth.leeway_secs)),
        );
        let identity = IdentifierSource::from(&config.client_identity);
        let routes = RouteTable::from_config(&config.routes, &limiters, &verifier, identity)?;

        for group in routes.groups() {
            tracing::info!(
                route = %group.name,
                upstream = %group.upstream,
                stages = ?group.gate.pipeline().stages().iter().map(|s| s.name()).collect::<Vec<_>>(),
                "Route group configured"
            );
        }

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            routes: Arc::new(routes),
            client,
            started: Instant::now(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            limiters: limiters.into_values().collect(),
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(response::health))
            .route("/", any(gateway_handler))
            .route("/{*path}", any(gateway_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TraceLayer::new_for_http())
                    .layer(middleware::from_fn(access_log))
                    .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
                    .layer(TimeoutLayer::with_status_code(
                        StatusCode::REQUEST_TIMEOUT,
                        Duration::from_secs(config.timeouts.request_secs),
                    )),
            )
    }

    /// The fully layered router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Every limiter instance, one per configured name.
    pub fn limiters(&self) -> &[Arc<RateLimiter>] {
        &self.limiters
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server until `shutdown` is triggered.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = WindowSweeper::new(self.limiters.clone(), &self.config.sweeper);
        tokio::spawn(sweeper.run(shutdown.subscribe()));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.signalled())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Match the route group, run its gate, forward on admission.
async fn gateway_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let path = match normalize_path(request.uri().path()) {
        Some(path) => path,
        None => {
            tracing::warn!(path = %request.uri().path(), "Rejected non-canonical path");
            metrics::record_request(&method, 400, "none", start);
            return response::bad_request();
        }
    };

    let group = match state.routes.match_path(&path) {
        Some(group) => group,
        None => {
            tracing::debug!(path = %path, "No route matched");
            metrics::record_request(&method, 404, "none", start);
            return response::not_found();
        }
    };

    let response = match group.gate.check(request.headers(), peer) {
        Ok(principal) => forward(&state.client, group, &path, principal.as_ref(), request).await,
        Err(rejection) => rejection.into_response(),
    };

    metrics::record_request(&method, response.status().as_u16(), &group.name, start);
    response
}

/// Send the request to the group's upstream with the principal attached.
///
/// `path` is the normalized path the group was matched on; the upstream
/// never sees the raw one.
async fn forward(
    client: &Client<HttpConnector, Body>,
    group: &RouteGroup,
    path: &str,
    principal: Option<&Principal>,
    request: Request<Body>,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let target = match parts.uri.query() {
        Some(query) => format!("http://{}{}?{}", group.upstream, path, query),
        None => format!("http://{}{}", group.upstream, path),
    };
    parts.uri = match target.parse::<Uri>() {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(route = %group.name, error = %e, "Failed to build upstream URI");
            return response::internal_error();
        }
    };
    parts.version = Version::HTTP_11;

    sanitize_forwarded_headers(&mut parts.headers);
    if let Some(principal) = principal {
        match HeaderValue::from_str(&principal.subject_id) {
            Ok(subject) => {
                parts.headers.insert(X_PRINCIPAL_ID, subject);
            }
            Err(_) => {
                tracing::error!(route = %group.name, "Principal subject is not a valid header value");
                return response::internal_error();
            }
        }
        parts
            .headers
            .insert(X_PRINCIPAL_ROLE, HeaderValue::from_static(principal.role.as_str()));
    }

    match client.request(Request::from_parts(parts, body)).await {
        Ok(upstream) => {
            let (parts, body) = upstream.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(route = %group.name, upstream = %group.upstream, error = %e, "Upstream error");
            response::bad_gateway()
        }
    }
}
