//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay the backend response (status, headers, body) to the client
//! - Strip hop-by-hop headers
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Everything except hop-by-hop headers is relayed unmodified

use axum::{body::Body, http::Response};

use crate::security::headers::strip_hop_by_hop;

/// Prepare a backend response for the client.
pub fn relay(mut response: Response<Body>) -> Response<Body> {
    strip_hop_by_hop(response.headers_mut());
    response
}
