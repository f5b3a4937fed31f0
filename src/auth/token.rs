//! Bearer token verification and issuance (HS256 JWT).
//!
//! # Responsibilities
//! - Parse the compact `header.claims.signature` form
//! - Reject any `alg` other than HS256 (including `none`)
//! - Verify the HMAC-SHA256 signature in constant time
//! - Enforce `exp` / `nbf` and decode the principal
//!
//! # Design Decisions
//! - Failure detail is logged at debug level only; callers see `Invalid`
//! - No I/O and no mutation: verification is a pure CPU-bound check

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::auth::principal::{Principal, Role};

type HmacSha256 = Hmac<Sha256>;

/// The only accepted signing algorithm.
pub const ALGORITHM: &str = "HS256";

/// Default token lifetime for issued tokens (7 days).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Errors produced by authentication and authorization checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No credential was supplied at all.
    #[error("no credential supplied")]
    Missing,

    /// Malformed, badly signed, wrong algorithm, or expired.
    #[error("credential is invalid or expired")]
    Invalid,

    /// Authenticated, but the role is not in the permitted set.
    #[error("role not permitted")]
    Forbidden,

    /// An authorization check ran without an authenticated principal.
    #[error("no authenticated principal")]
    NotAuthenticated,

    /// The signing key is empty or otherwise unusable.
    #[error("signing key unavailable")]
    KeyUnavailable,
}

/// Shared HMAC secret. Never printed.
#[derive(Clone)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        if self.0.is_empty() {
            return Err(AuthError::KeyUnavailable);
        }
        HmacSha256::new_from_slice(&self.0).map_err(|_| AuthError::KeyUnavailable)
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

#[derive(Debug, Deserialize)]
struct Header {
    alg: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(alias = "sub")]
    id: String,
    role: String,
    exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nbf: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<u64>,
}

/// Validates bearer credentials and produces principals.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    key: SigningKey,
    leeway_secs: u64,
}

impl TokenVerifier {
    pub fn new(key: SigningKey) -> Self {
        Self { key, leeway_secs: 0 }
    }

    /// Allow this much clock skew when checking `exp` and `nbf`.
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway_secs = leeway.as_secs();
        self
    }

    /// Verify against the current wall clock.
    pub fn verify(&self, credential: Option<&str>) -> Result<Principal, AuthError> {
        self.verify_at(credential, unix_now())
    }

    /// Verify as of `now` (seconds since the Unix epoch).
    pub fn verify_at(&self, credential: Option<&str>, now: u64) -> Result<Principal, AuthError> {
        let token = credential.ok_or(AuthError::Missing)?;
        let mut mac = self.key.mac()?;

        let mut segments = token.split('.');
        let (header_b64, claims_b64, signature_b64) =
            match (segments.next(), segments.next(), segments.next(), segments.next()) {
                (Some(h), Some(c), Some(s), None) if !h.is_empty() && !c.is_empty() => (h, c, s),
                _ => return reject("malformed token"),
            };

        let header: Header = match decode_json(header_b64) {
            Some(h) => h,
            None => return reject("undecodable header"),
        };
        if header.alg != ALGORITHM {
            tracing::debug!(alg = %header.alg, "Rejected token algorithm");
            return Err(AuthError::Invalid);
        }

        let signature = match URL_SAFE_NO_PAD.decode(signature_b64) {
            Ok(sig) => sig,
            Err(_) => return reject("undecodable signature"),
        };
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        if mac.verify_slice(&signature).is_err() {
            return reject("signature mismatch");
        }

        let claims: Claims = match decode_json(claims_b64) {
            Some(c) => c,
            None => return reject("undecodable claims"),
        };
        if now >= claims.exp.saturating_add(self.leeway_secs) {
            return reject("token expired");
        }
        if let Some(nbf) = claims.nbf {
            if now.saturating_add(self.leeway_secs) < nbf {
                return reject("token not yet valid");
            }
        }
        if claims.id.is_empty() {
            return reject("empty subject");
        }
        let role = match claims.role.parse::<Role>() {
            Ok(role) => role,
            Err(_) => return reject("unknown role"),
        };

        Ok(Principal {
            subject_id: claims.id,
            role,
        })
    }
}

/// Mints HS256 tokens. Used by tooling and tests; the gateway never issues.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    key: SigningKey,
}

impl TokenIssuer {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Issue a token valid from now for `ttl`.
    pub fn issue(&self, subject_id: &str, role: Role, ttl: Duration) -> Result<String, AuthError> {
        let now = unix_now();
        self.issue_at(subject_id, role, now, now.saturating_add(ttl.as_secs()))
    }

    /// Issue a token with explicit `iat` / `exp` timestamps.
    pub fn issue_at(
        &self,
        subject_id: &str,
        role: Role,
        issued_at: u64,
        expires_at: u64,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            id: subject_id.to_string(),
            role: role.as_str().to_string(),
            exp: expires_at,
            nbf: None,
            iat: Some(issued_at),
        };
        let header = serde_json::json!({ "alg": ALGORITHM, "typ": "JWT" });
        let claims = serde_json::to_value(&claims).map_err(|_| AuthError::Invalid)?;
        sign_segments(&self.key, &header, &claims)
    }
}

/// Encode and sign arbitrary header/claims JSON.
fn sign_segments(
    key: &SigningKey,
    header: &serde_json::Value,
    claims: &serde_json::Value,
) -> Result<String, AuthError> {
    let mut mac = key.mac()?;
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    );
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("{}.{}", signing_input, signature))
}

fn decode_json<T: DeserializeOwned>(segment: &str) -> Option<T> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn reject(reason: &'static str) -> Result<Principal, AuthError> {
    tracing::debug!(reason, "Rejected bearer token");
    Err(AuthError::Invalid)
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
