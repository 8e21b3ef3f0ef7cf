//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound request:
//!     → headers.rs (strip hop-by-hop headers)
//!     → cookies.rs (allow-list filter on `cookie`)
//!     → Pass to transport
//! ```
//!
//! # Design Decisions
//! - Fail closed: no cookie crosses to a backend unless explicitly allowed
//! - No trust in client input

pub mod cookies;
pub mod headers;

pub use cookies::{filter_cookies, CookiePolicy};
