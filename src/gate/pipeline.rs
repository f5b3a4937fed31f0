//! Ordered gate stages evaluated per request.
//!
//! ```text
//! Start → RateLimit → [429] → Authenticate → [401] → Authorize → [403] → Admit
//! ```
//!
//! Evaluation stops at the first rejection; later stages never observe the
//! request. Stage order is fixed by the pipeline, not by the order in which
//! stages were added.

use std::sync::Arc;
use std::time::Instant;

use crate::auth::{Principal, TokenVerifier};
use crate::gate::rejection::Rejection;
use crate::security::rate_limit::{Admission, RateLimiter};
use crate::security::authorize::{authorize, AllowedRoles};

/// Everything the stages need to know about one request.
#[derive(Debug, Clone, Copy)]
pub struct GateRequest<'a> {
    /// Rate-limit key derived from the caller's network origin.
    pub identifier: &'a str,
    /// Bearer token; `None` when no `Authorization` header was sent.
    pub credential: Option<&'a str>,
    /// Monotonic clock reading for the rate limiter.
    pub now: Instant,
    /// Wall clock, seconds since the Unix epoch, for token expiry.
    pub unix_now: u64,
}

/// Result of running one stage.
#[derive(Debug)]
pub enum Outcome {
    Admit,
    Reject(Rejection),
}

/// One check in the pipeline.
#[derive(Debug, Clone)]
pub enum Stage {
    RateLimit(Arc<RateLimiter>),
    Authenticate(Arc<TokenVerifier>),
    Authorize(AllowedRoles),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::RateLimit(_) => "rate_limit",
            Stage::Authenticate(_) => "authenticate",
            Stage::Authorize(_) => "authorize",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Stage::RateLimit(_) => 0,
            Stage::Authenticate(_) => 1,
            Stage::Authorize(_) => 2,
        }
    }

    fn check(&self, request: &GateRequest<'_>, principal: &mut Option<Principal>) -> Outcome {
        match self {
            Stage::RateLimit(limiter) => match limiter.admit(request.identifier, request.now) {
                Admission::Admitted { .. } => Outcome::Admit,
                Admission::Rejected { retry_after } => {
                    Outcome::Reject(Rejection::RateLimited { retry_after })
                }
            },
            Stage::Authenticate(verifier) => {
                match verifier.verify_at(request.credential, request.unix_now) {
                    Ok(p) => {
                        *principal = Some(p);
                        Outcome::Admit
                    }
                    Err(e) => Outcome::Reject(e.into()),
                }
            }
            Stage::Authorize(allowed) => match authorize(principal.as_ref(), allowed) {
                Ok(()) => Outcome::Admit,
                Err(e) => Outcome::Reject(e.into()),
            },
        }
    }
}

/// A fixed, ordered list of stages.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run every stage in order, stopping at the first rejection.
    ///
    /// Returns the authenticated principal when an authentication stage ran.
    pub fn evaluate(&self, request: &GateRequest<'_>) -> Result<Option<Principal>, Rejection> {
        let mut principal = None;
        for stage in &self.stages {
            if let Outcome::Reject(rejection) = stage.check(request, &mut principal) {
                return Err(rejection);
            }
        }
        Ok(principal)
    }
}

#[derive(Debug, Default)]
pub struct PipelineBuilder {
    stages: Vec<Stage>,
}

impl PipelineBuilder {
    pub fn rate_limit(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.stages.push(Stage::RateLimit(limiter));
        self
    }

    pub fn authenticate(mut self, verifier: Arc<TokenVerifier>) -> Self {
        self.stages.push(Stage::Authenticate(verifier));
        self
    }

    pub fn authorize(mut self, roles: impl Into<AllowedRoles>) -> Self {
        self.stages.push(Stage::Authorize(roles.into()));
        self
    }

    pub fn build(mut self) -> Pipeline {
        // Stable: stages of the same kind keep their insertion order.
        self.stages.sort_by_key(Stage::rank);
        Pipeline {
            stages: self.stages,
        }
    }
}
