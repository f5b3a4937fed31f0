//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Resolve the signing secret from the environment
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The secret is never embedded in config or source

use std::path::Path;
use thiserror::Error;

use crate::auth::token::SigningKey;
use crate::config::{load_config, AuthConfig, ConfigError, GatewayConfig};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("signing secret environment variable {0} is not set or empty")]
    MissingSecret(String),
}

/// Load config from `path`, or use defaults when no path is given.
///
/// Runs before logging is installed, so it does not log.
pub fn load(path: Option<&Path>) -> Result<GatewayConfig, StartupError> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => Ok(GatewayConfig::default()),
    }
}

/// Read the signing secret named by `auth.secret_env`.
pub fn signing_key(auth: &AuthConfig) -> Result<SigningKey, StartupError> {
    signing_key_from(auth, |name| std::env::var(name).ok())
}

fn signing_key_from(
    auth: &AuthConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<SigningKey, StartupError> {
    match lookup(&auth.secret_env) {
        Some(secret) if !secret.is_empty() => Ok(SigningKey::new(secret)),
        _ => Err(StartupError::MissingSecret(auth.secret_env.clone())),
    }
}
