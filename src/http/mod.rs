//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, catch-all handler)
//!     → request.rs (request ID)
//!     → [routing layer resolves service + target]
//!     → rewrite.rs (headers, cookies, body re-encoding)
//!     → forward.rs → transport.rs (single upstream call)
//!     → response.rs (relay, strip hop-by-hop headers)
//!     → error.rs (any failure → status + body)
//!     → Send to client
//! ```

pub mod error;
pub mod forward;
pub mod request;
pub mod response;
pub mod rewrite;
pub mod server;
pub mod transport;

pub use error::{ErrorKind, GatewayError};
pub use request::X_REQUEST_ID;
pub use rewrite::{OutboundRequest, RequestRewriter};
pub use server::{build_router, AppState, HttpServer};
pub use transport::{FailureCode, HttpTransport, Transport, TransportError};
