//! Forwarding rewritten requests through the transport.

use axum::{body::Body, http::Response};

use crate::http::response::relay;
use crate::http::rewrite::OutboundRequest;
use crate::http::transport::{Transport, TransportError};

/// Send `request` once and relay whatever the backend answers.
pub async fn forward(
    transport: &dyn Transport,
    request: OutboundRequest,
) -> Result<Response<Body>, TransportError> {
    let method = request.method.clone();
    let url = request.url.clone();

    tracing::info!(method = %method, url = %url, "Sending {} {}", method, url);

    let response = transport.send(request).await?;

    tracing::info!(
        method = %method,
        url = %url,
        status = response.status().as_u16(),
        "Received {} {}",
        method,
        url
    );

    Ok(relay(response))
}
