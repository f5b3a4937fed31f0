//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (route lookup)
//!     → matcher.rs (segment-aware prefix match)
//!     → Return: matched RouteGroup (gate + upstream) or NoMatch
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Resolve named limiters, build each group's gate
//!     → Sort by prefix specificity
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: longest prefix wins, ties keep declaration order

pub mod matcher;
pub mod router;

pub use matcher::PathPrefixMatcher;
pub use router::{RouteGroup, RouteTable};
