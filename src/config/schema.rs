//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::auth::token::DEFAULT_TOKEN_TTL;
use crate::auth::Role;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Token verification settings.
    pub auth: AuthConfig,

    /// How the rate-limit identifier is derived.
    pub client_identity: ClientIdentityConfig,

    /// Named limiter instances. Each name is one isolated counter table.
    pub rate_limits: BTreeMap<String, RateLimitConfig>,

    /// Expired rate window eviction.
    pub sweeper: SweeperConfig,

    /// Route groups, matched by longest path prefix.
    pub routes: Vec<RouteConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let mut rate_limits = BTreeMap::new();
        rate_limits.insert("auth".to_string(), RateLimitConfig::default());
        rate_limits.insert("api".to_string(), RateLimitConfig::default());

        Self {
            listener: ListenerConfig::default(),
            auth: AuthConfig::default(),
            client_identity: ClientIdentityConfig::default(),
            rate_limits,
            sweeper: SweeperConfig::default(),
            routes: default_routes(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Route table of the REST backend this gateway was built to front.
fn default_routes() -> Vec<RouteConfig> {
    let upstream = "127.0.0.1:5000";
    vec![
        RouteConfig::public("auth", "/auth", "auth", upstream),
        RouteConfig::protected("performance", "/performance", "api", upstream, None),
        RouteConfig::protected(
            "performance-all",
            "/performance/all",
            "api",
            upstream,
            Some(vec![Role::Coach, Role::Admin]),
        ),
        RouteConfig::protected("coach", "/coach", "api", upstream, None),
        RouteConfig::protected(
            "coach-players",
            "/coach/players",
            "api",
            upstream,
            Some(vec![Role::Coach, Role::Admin, Role::Scout]),
        ),
        RouteConfig::protected("admin", "/admin", "api", upstream, Some(vec![Role::Admin])),
        RouteConfig::protected("recommendations", "/recommendations", "api", upstream, None),
    ]
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Token verification configuration.
///
/// The secret itself never lives in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Environment variable holding the HMAC signing secret.
    pub secret_env: String,

    /// Allowed clock skew for `exp` / `nbf`, in seconds.
    pub leeway_secs: u64,

    /// Lifetime of tokens minted by the CLI, in seconds.
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_env: "JWT_SECRET".to_string(),
            leeway_secs: 0,
            token_ttl_secs: DEFAULT_TOKEN_TTL.as_secs(),
        }
    }
}

impl AuthConfig {
    /// Lifetime given to newly issued tokens.
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}

/// Client identifier configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientIdentityConfig {
    /// Use `X-Forwarded-For` instead of the peer address.
    /// Only enable behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

/// Rate limiting configuration for one limiter instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per identifier per window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 15 * 60,
        }
    }
}

/// Rate window sweeper configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SweeperConfig {
    /// Seconds between sweeps; 0 disables the sweeper.
    pub interval_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

/// A route group: one path prefix, one gate policy, one upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path prefix to match (segment-aware).
    pub path_prefix: String,

    /// Name of the limiter in `rate_limits`; none means unlimited.
    #[serde(default)]
    pub rate_limit: Option<String>,

    /// Require a valid bearer token.
    #[serde(default)]
    pub authenticate: bool,

    /// Roles permitted; requires `authenticate = true`.
    #[serde(default)]
    pub roles: Option<Vec<Role>>,

    /// Upstream address (e.g., "127.0.0.1:5000").
    pub upstream: String,
}

impl RouteConfig {
    pub fn public(name: &str, path_prefix: &str, rate_limit: &str, upstream: &str) -> Self {
        Self {
            name: name.to_string(),
            path_prefix: path_prefix.to_string(),
            rate_limit: Some(rate_limit.to_string()),
            authenticate: false,
            roles: None,
            upstream: upstream.to_string(),
        }
    }

    pub fn protected(
        name: &str,
        path_prefix: &str,
        rate_limit: &str,
        upstream: &str,
        roles: Option<Vec<Role>>,
    ) -> Self {
        Self {
            authenticate: true,
            roles,
            ..Self::public(name, path_prefix, rate_limit, upstream)
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_file_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.rate_limits["api"].max_requests, 100);
        assert_eq!(config.rate_limits["auth"].window_secs, 900);
        assert_eq!(config.auth.secret_env, "JWT_SECRET");
        assert_eq!(config.routes.len(), 7);
    }

    #[test]
    fn test_parse_route_groups() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [rate_limits.strict]
            max_requests = 3
            window_secs = 60

            [[routes]]
            name = "roster"
            path_prefix = "/roster"
            rate_limit = "strict"
            authenticate = true
            roles = ["coach", "scout"]
            upstream = "10.0.0.5:8000"
            "#,
        )
        .unwrap();

        // An explicit table replaces the defaults.
        assert_eq!(config.rate_limits.len(), 1);
        assert_eq!(config.routes.len(), 1);
        let route = &config.routes[0];
        assert_eq!(route.roles, Some(vec![Role::Coach, Role::Scout]));
        assert_eq!(route.rate_limit.as_deref(), Some("strict"));
    }

    #[test]
    fn test_token_ttl_from_config() {
        assert_eq!(AuthConfig::default().token_ttl(), DEFAULT_TOKEN_TTL);

        let config: GatewayConfig = toml::from_str(
            r#"
            [auth]
            secret_env = "ROSTER_SECRET"
            token_ttl_secs = 3600
            "#,
        )
        .unwrap();
        assert_eq!(config.auth.token_ttl(), Duration::from_secs(3600));
        assert_eq!(config.auth.secret_env, "ROSTER_SECRET");
    }

    #[test]
    fn test_unknown_role_fails_to_parse() {
        let result: Result<GatewayConfig, _> = toml::from_str(
            r#"
            [[routes]]
            name = "x"
            path_prefix = "/x"
            authenticate = true
            roles = ["owner"]
            upstream = "127.0.0.1:1"
            "#,
        );
        assert!(result.is_err());
    }
}
