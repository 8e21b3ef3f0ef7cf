//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, query, headers)
//!     → router.rs (read service header + target override)
//!     → registry.rs (service name → base URL)
//!     → path.rs (base + prefix + target)
//!     → Return: RouteDecision or classified RouteError
//!
//! Registry Construction (at startup):
//!     [services] table
//!     → ServiceRegistry (immutable)
//!     → owned by Router, shared via Arc
//! ```
//!
//! # Design Decisions
//! - Registry built at startup, immutable at runtime
//! - Exact-match lookup, no normalization
//! - Deterministic: same input always resolves to the same target

pub mod path;
pub mod registry;
pub mod router;

pub use path::concat_path;
pub use registry::ServiceRegistry;
pub use router::{RouteDecision, RouteError, RouteRequest, Router};
