//! Request gatekeeping.
//!
//! # Data Flow
//! ```text
//! Request (headers + peer address)
//!     → Gate::check
//!         → client_ip (identifier)
//!         → pipeline.rs (rate limit → authenticate → authorize)
//!     → Ok(principal)  → handler / upstream
//!     → Err(rejection) → rejection.rs (429 / 401 / 403 / 500)
//! ```
//!
//! # Design Decisions
//! - Stages return typed outcomes; only `Rejection` writes responses
//! - The check is synchronous and in-memory, so a dropped connection can
//!   never leave a counter half-updated

pub mod middleware;
pub mod pipeline;
pub mod rejection;

use axum::http::{header, HeaderMap};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::auth::token::unix_now;
use crate::auth::Principal;
use crate::observability::metrics;
use crate::security::client_ip::IdentifierSource;

pub use middleware::enforce;
pub use pipeline::{GateRequest, Outcome, Pipeline, PipelineBuilder, Stage};
pub use rejection::Rejection;

/// A pipeline bound to an identifier source and a label for logs.
#[derive(Debug, Clone)]
pub struct Gate {
    label: Arc<str>,
    pipeline: Arc<Pipeline>,
    identity: IdentifierSource,
}

impl Gate {
    pub fn new(label: impl Into<Arc<str>>, pipeline: Pipeline, identity: IdentifierSource) -> Self {
        Self {
            label: label.into(),
            pipeline: Arc::new(pipeline),
            identity,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Run the pipeline for a request from `peer`.
    pub fn check(&self, headers: &HeaderMap, peer: SocketAddr) -> Result<Option<Principal>, Rejection> {
        let identifier = self.identity.identify(headers, peer);
        let request = GateRequest {
            identifier: &identifier,
            credential: bearer_credential(headers),
            now: Instant::now(),
            unix_now: unix_now(),
        };

        let result = self.pipeline.evaluate(&request);
        if let Err(rejection) = &result {
            tracing::warn!(
                route = %self.label,
                client = %identifier,
                reason = rejection.reason(),
                status = rejection.status().as_u16(),
                "Request rejected by gate"
            );
            metrics::record_rejection(&self.label, rejection.reason());
        }
        result
    }
}

/// Extract the bearer token from `Authorization`.
///
/// `None` only when the header is absent. A present header that is not a
/// well-formed `Bearer <token>` yields `Some("")`, which fails verification.
pub fn bearer_credential(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?;
    let token = value
        .to_str()
        .ok()
        .and_then(|v| {
            let (scheme, token) = v.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .unwrap_or("");
    Some(token)
}
