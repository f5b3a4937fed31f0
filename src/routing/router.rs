//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled route groups
//! - Look up the matching group for a request path
//! - Return matched group or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) path prefix scan (acceptable for typical route counts)
//! - Explicit NoMatch rather than silent default

use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::auth::TokenVerifier;
use crate::config::RouteConfig;
use crate::gate::{Gate, Pipeline};
use crate::routing::matcher::PathPrefixMatcher;
use crate::security::{AllowedRoles, IdentifierSource, RateLimiter};

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route '{route}' references unknown rate limiter '{limiter}'")]
    UnknownLimiter { route: String, limiter: String },
}

/// A compiled route group.
#[derive(Debug, Clone)]
pub struct RouteGroup {
    pub name: String,
    pub matcher: PathPrefixMatcher,
    pub gate: Gate,
    pub upstream: String,
}

/// All route groups, most specific first.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    groups: Vec<RouteGroup>,
}

impl RouteTable {
    /// Compile route configs into gated groups.
    ///
    /// Groups naming the same limiter share that one instance.
    pub fn from_config(
        routes: &[RouteConfig],
        limiters: &BTreeMap<String, Arc<RateLimiter>>,
        verifier: &Arc<TokenVerifier>,
        identity: IdentifierSource,
    ) -> Result<Self, RouteError> {
        let mut groups = Vec::with_capacity(routes.len());

        for route in routes {
            let mut pipeline = Pipeline::builder();

            if let Some(name) = &route.rate_limit {
                let limiter = limiters.get(name).ok_or_else(|| RouteError::UnknownLimiter {
                    route: route.name.clone(),
                    limiter: name.clone(),
                })?;
                pipeline = pipeline.rate_limit(limiter.clone());
            }
            if route.authenticate {
                pipeline = pipeline.authenticate(verifier.clone());
            }
            if let Some(roles) = &route.roles {
                pipeline = pipeline.authorize(AllowedRoles::new(roles.iter().copied()));
            }

            groups.push(RouteGroup {
                name: route.name.clone(),
                matcher: PathPrefixMatcher::new(route.path_prefix.as_str()),
                gate: Gate::new(route.name.as_str(), pipeline.build(), identity),
                upstream: route.upstream.clone(),
            });
        }

        // Stable sort keeps declaration order among equal prefixes.
        groups.sort_by(|a, b| b.matcher.specificity().cmp(&a.matcher.specificity()));

        tracing::debug!(routes = groups.len(), "Route table compiled");
        Ok(Self { groups })
    }

    /// Most specific group for a path already passed through `normalize_path`.
    pub fn match_path(&self, path: &str) -> Option<&RouteGroup> {
        self.groups.iter().find(|group| group.matcher.matches(path))
    }

    pub fn groups(&self) -> &[RouteGroup] {
        &self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::SigningKey;
    use crate::auth::Role;
    use crate::config::GatewayConfig;
    use crate::gate::Stage;
    use crate::security::RatePolicy;

    fn limiters(names: &[&str]) -> BTreeMap<String, Arc<RateLimiter>> {
        names
            .iter()
            .map(|name| (name.to_string(), Arc::new(RateLimiter::new(*name, RatePolicy::default()))))
            .collect()
    }

    fn verifier() -> Arc<TokenVerifier> {
        Arc::new(TokenVerifier::new(SigningKey::new("routes")))
    }

    fn default_table() -> RouteTable {
        RouteTable::from_config(
            &GatewayConfig::default().routes,
            &limiters(&["auth", "api"]),
            &verifier(),
            IdentifierSource::peer_only(),
        )
        .unwrap()
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = default_table();
        assert_eq!(table.match_path("/coach/players").unwrap().name, "coach-players");
        assert_eq!(table.match_path("/coach/players/12").unwrap().name, "coach-players");
        assert_eq!(table.match_path("/coach/compare").unwrap().name, "coach");
        assert_eq!(table.match_path("/performance/all").unwrap().name, "performance-all");
        assert_eq!(table.match_path("/performance/my").unwrap().name, "performance");
        assert_eq!(table.match_path("/auth/login").unwrap().name, "auth");
        assert!(table.match_path("/unknown").is_none());
        assert!(table.match_path("/authx").is_none());
    }

    #[test]
    fn test_case_variants_reach_the_restricted_group() {
        let table = default_table();
        assert_eq!(table.match_path("/performance/ALL").unwrap().name, "performance-all");
        assert_eq!(table.match_path("/Coach/Players").unwrap().name, "coach-players");
        assert_eq!(table.match_path("/ADMIN").unwrap().name, "admin");
    }

    #[test]
    fn test_group_stages_follow_config() {
        let table = default_table();

        let auth = table.match_path("/auth/login").unwrap();
        let names: Vec<_> = auth.gate.pipeline().stages().iter().map(Stage::name).collect();
        assert_eq!(names, ["rate_limit"]);

        let admin = table.match_path("/admin/users").unwrap();
        let stages = admin.gate.pipeline().stages();
        assert_eq!(stages.len(), 3);
        match &stages[2] {
            Stage::Authorize(roles) => {
                assert!(roles.contains(Role::Admin));
                assert!(!roles.contains(Role::Coach));
            }
            other => panic!("unexpected stage {}", other.name()),
        }
    }

    #[test]
    fn test_groups_share_named_limiter() {
        let table = default_table();
        let limiter_of = |path: &str| match &table.match_path(path).unwrap().gate.pipeline().stages()[0] {
            Stage::RateLimit(limiter) => limiter.clone(),
            other => panic!("unexpected stage {}", other.name()),
        };

        assert!(Arc::ptr_eq(&limiter_of("/coach"), &limiter_of("/admin")));
        assert!(!Arc::ptr_eq(&limiter_of("/auth"), &limiter_of("/admin")));
    }

    #[test]
    fn test_unknown_limiter_is_an_error() {
        let routes = vec![RouteConfig::public("x", "/x", "nope", "127.0.0.1:1")];
        let result = RouteTable::from_config(
            &routes,
            &limiters(&["api"]),
            &verifier(),
            IdentifierSource::peer_only(),
        );
        assert!(matches!(result, Err(RouteError::UnknownLimiter { .. })));
    }
}
