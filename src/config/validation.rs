//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing limiters)
//! - Validate value ranges (limits > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("listener.max_body_bytes must be greater than 0")]
    MaxBodyBytes,

    #[error("timeouts.request_secs must be greater than 0")]
    RequestTimeout,

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),

    #[error("auth.secret_env must not be empty")]
    SecretEnv,

    #[error("rate_limits.{0}.max_requests must be greater than 0")]
    MaxRequests(String),

    #[error("rate_limits.{0}.window_secs must be greater than 0")]
    Window(String),

    #[error("route '{0}' is declared more than once")]
    DuplicateRoute(String),

    #[error("route '{route}' path_prefix '{prefix}' must start with '/'")]
    PathPrefix { route: String, prefix: String },

    #[error("route '{route}' references unknown rate limiter '{limiter}'")]
    UnknownLimiter { route: String, limiter: String },

    #[error("route '{0}' lists roles but does not authenticate")]
    RolesWithoutAuthentication(String),

    #[error("route '{0}' has an empty roles list")]
    EmptyRoles(String),

    #[error("route '{route}' upstream '{upstream}' must be host:port")]
    Upstream { route: String, upstream: String },
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::MaxBodyBytes);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }
    if config.auth.secret_env.trim().is_empty() {
        errors.push(ValidationError::SecretEnv);
    }

    for (name, limit) in &config.rate_limits {
        if limit.max_requests == 0 {
            errors.push(ValidationError::MaxRequests(name.clone()));
        }
        if limit.window_secs == 0 {
            errors.push(ValidationError::Window(name.clone()));
        }
    }

    let mut seen = HashSet::new();
    for route in &config.routes {
        if !seen.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }
        if !route.path_prefix.starts_with('/') {
            errors.push(ValidationError::PathPrefix {
                route: route.name.clone(),
                prefix: route.path_prefix.clone(),
            });
        }
        if let Some(limiter) = &route.rate_limit {
            if !config.rate_limits.contains_key(limiter) {
                errors.push(ValidationError::UnknownLimiter {
                    route: route.name.clone(),
                    limiter: limiter.clone(),
                });
            }
        }
        if let Some(roles) = &route.roles {
            if !route.authenticate {
                errors.push(ValidationError::RolesWithoutAuthentication(route.name.clone()));
            }
            if roles.is_empty() {
                errors.push(ValidationError::EmptyRoles(route.name.clone()));
            }
        }
        if !is_host_port(&route.upstream) {
            errors.push(ValidationError::Upstream {
                route: route.name.clone(),
                upstream: route.upstream.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_host_port(value: &str) -> bool {
    match value.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && !host.contains('/') && port.parse::<u16>().is_ok(),
        None => false,
    }
}
