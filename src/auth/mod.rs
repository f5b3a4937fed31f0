//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <token>
//!     → token.rs (split, check alg, verify HMAC, decode claims)
//!     → principal.rs (Principal { subject_id, role })
//!     → attached to the request for the rest of its lifetime
//! ```
//!
//! # Design Decisions
//! - Only HS256 is accepted; the header `alg` is checked, never trusted
//! - Signature is verified before any claim is deserialized
//! - Principals are never persisted

pub mod principal;
pub mod token;

pub use principal::{Principal, Role};
pub use token::{AuthError, TokenIssuer, TokenVerifier};
