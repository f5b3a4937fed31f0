//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, timeout, body limit)
//!     → request.rs (access log)
//!     → routing (pick route group by path prefix)
//!     → gate (rate limit → authenticate → authorize)
//!     → server.rs (forward to the group's upstream)
//!     → response.rs (JSON error bodies, health)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{X_PRINCIPAL_ID, X_PRINCIPAL_ROLE, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
