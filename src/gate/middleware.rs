//! Axum integration for the gate.
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/roster", get(roster))
//!     .layer(axum::middleware::from_fn_with_state(gate, gatekeeper::gate::enforce));
//! ```
//!
//! The router must be served with `into_make_service_with_connect_info::<SocketAddr>()`.

use axum::{
    body::Body,
    extract::{ConnectInfo, FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

use crate::auth::{AuthError, Principal};
use crate::gate::{Gate, Rejection};

/// Middleware that runs the gate and attaches the principal on admission.
pub async fn enforce(
    State(gate): State<Gate>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match gate.check(request.headers(), peer) {
        Ok(principal) => {
            if let Some(principal) = principal {
                request.extensions_mut().insert(principal);
            }
            next.run(request).await
        }
        Err(rejection) => rejection.into_response(),
    }
}

/// Handlers can take `Principal` directly; it is only present after a gate
/// with an authentication stage admitted the request.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(Rejection::Forbidden(AuthError::NotAuthenticated))
    }
}
