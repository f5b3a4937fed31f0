//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client_ip.rs (derive rate-limit identifier)
//!     → rate_limit.rs (fixed-window counter per identifier)
//!     → [token verification, see auth]
//!     → authorize.rs (role membership check)
//!     → Pass to upstream
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in client input
//! - Counter tables are owned values injected into the gate, never globals

pub mod authorize;
pub mod client_ip;
pub mod rate_limit;
pub mod sweeper;

pub use authorize::{authorize, AllowedRoles};
pub use client_ip::IdentifierSource;
pub use rate_limit::{Admission, RateLimiter, RatePolicy, RateWindow};
