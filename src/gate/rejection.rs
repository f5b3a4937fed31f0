//! Rejection outcomes and their fixed HTTP response contracts.
//!
//! This is the only place gate outcomes are turned into status codes and
//! bodies; stages themselves never touch the response.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::auth::AuthError;

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please try again later.";
pub const NO_TOKEN_MESSAGE: &str = "No token provided";
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or expired token";
pub const ACCESS_DENIED_MESSAGE: &str = "Access denied";
pub const NOT_AUTHENTICATED_MESSAGE: &str = "Not authenticated";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Why the gate refused a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("rate limit exceeded, retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// `AuthError::Missing` or `AuthError::Invalid`.
    #[error("unauthenticated: {0}")]
    Unauthenticated(AuthError),

    /// `AuthError::Forbidden` or `AuthError::NotAuthenticated`.
    #[error("forbidden: {0}")]
    Forbidden(AuthError),

    /// Unexpected fault; details stay in the logs.
    #[error("internal gate failure")]
    Internal,
}

impl From<AuthError> for Rejection {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Missing | AuthError::Invalid => Rejection::Unauthenticated(err),
            AuthError::Forbidden | AuthError::NotAuthenticated => Rejection::Forbidden(err),
            AuthError::KeyUnavailable => {
                tracing::error!("Token signing key unavailable");
                Rejection::Internal
            }
        }
    }
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Rejection::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Rejection::Forbidden(_) => StatusCode::FORBIDDEN,
            Rejection::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::RateLimited { .. } => "rate_limited",
            Rejection::Unauthenticated(AuthError::Missing) => "missing_token",
            Rejection::Unauthenticated(_) => "invalid_token",
            Rejection::Forbidden(AuthError::NotAuthenticated) => "not_authenticated",
            Rejection::Forbidden(_) => "forbidden",
            Rejection::Internal => "internal",
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            Rejection::RateLimited { retry_after } => json!({
                "success": false,
                "message": RATE_LIMITED_MESSAGE,
                "retryAfter": retry_after.as_secs(),
            }),
            Rejection::Unauthenticated(AuthError::Missing) => json!({ "message": NO_TOKEN_MESSAGE }),
            Rejection::Unauthenticated(_) => json!({ "message": INVALID_TOKEN_MESSAGE }),
            Rejection::Forbidden(AuthError::NotAuthenticated) => {
                json!({ "message": NOT_AUTHENTICATED_MESSAGE })
            }
            Rejection::Forbidden(_) => json!({ "message": ACCESS_DENIED_MESSAGE }),
            Rejection::Internal => json!({ "success": false, "message": INTERNAL_ERROR_MESSAGE }),
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.body())).into_response();
        if let Rejection::RateLimited { retry_after } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
