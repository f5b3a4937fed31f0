//! Client identifier derivation for rate limiting.
//!
//! # Design Decisions
//! - Peer socket IP by default
//! - `X-Forwarded-For` only when explicitly trusted (gateway behind a proxy)
//! - Never returns an empty identifier

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

use crate::config::ClientIdentityConfig;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Where the rate-limit identifier comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentifierSource {
    trust_forwarded_for: bool,
}

impl IdentifierSource {
    pub fn peer_only() -> Self {
        Self {
            trust_forwarded_for: false,
        }
    }

    pub fn trusting_forwarded_for() -> Self {
        Self {
            trust_forwarded_for: true,
        }
    }

    /// Derive the identifier for a request from `peer`.
    pub fn identify(&self, headers: &HeaderMap, peer: SocketAddr) -> String {
        if self.trust_forwarded_for {
            if let Some(ip) = forwarded_client(headers) {
                return ip.to_string();
            }
        }
        peer.ip().to_string()
    }
}

impl From<&ClientIdentityConfig> for IdentifierSource {
    fn from(config: &ClientIdentityConfig) -> Self {
        Self {
            trust_forwarded_for: config.trust_forwarded_for,
        }
    }
}

/// First valid IP in `X-Forwarded-For`.
fn forwarded_client(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|candidate| candidate.trim().parse::<IpAddr>().ok())
}
