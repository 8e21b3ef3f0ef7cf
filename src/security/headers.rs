//! Hop-by-hop header handling.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Strip headers nominated by the `connection` header
//!
//! # Design Decisions
//! - Framing headers are owned by each hop's HTTP stack, never relayed

use axum::http::{header, HeaderMap, HeaderName};

/// Headers that describe a single connection and never cross a proxy.
pub const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove hop-by-hop headers, including any listed in `connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let nominated: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in nominated.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}
