//! Upstream transport.
//!
//! # Responsibilities
//! - Send a rewritten request to its target URL
//! - Stream the backend response back without buffering
//! - Classify transport failures (peer reset vs everything else)
//!
//! # Design Decisions
//! - One attempt per request; nothing is retried
//! - Redirects are relayed to the caller, never followed
//! - Connect and total request timeouts come from configuration

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use axum::{body::Body, http::Response};
use thiserror::Error;

use crate::config::schema::TimeoutConfig;
use crate::http::rewrite::OutboundRequest;

/// Machine-readable cause of a failed upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCode {
    ConnectionRefused,
    Timeout,
    DnsFailure,
    Connect,
    Protocol,
    Unknown,
}

impl FailureCode {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureCode::ConnectionRefused => "ECONNREFUSED",
            FailureCode::Timeout => "ETIMEDOUT",
            FailureCode::DnsFailure => "ENOTFOUND",
            FailureCode::Connect => "ECONNECT",
            FailureCode::Protocol => "EPROTO",
            FailureCode::Unknown => "EUNKNOWN",
        }
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport-level failure.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The connection was reset or aborted by the peer.
    #[error("connection reset by peer")]
    Reset,

    #[error("upstream request failed ({code}): {message}")]
    Failure { code: FailureCode, message: String },
}

/// Sends rewritten requests to backends.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<Response<Body>, TransportError>;
}

/// Transport backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.request_secs))
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: OutboundRequest) -> Result<Response<Body>, TransportError> {
        let upstream = self
            .client
            .request(request.method, request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(|e| classify(&e))?;

        let status = upstream.status();
        let version = upstream.version();
        let headers = upstream.headers().clone();

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.version_mut() = version;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// Map a client error onto the transport taxonomy.
pub fn classify(err: &reqwest::Error) -> TransportError {
    let failure = |code: FailureCode| TransportError::Failure {
        code,
        message: err.to_string(),
    };

    if let Some(kind) = io_error_kind(err) {
        match kind {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => return TransportError::Reset,
            io::ErrorKind::ConnectionRefused => return failure(FailureCode::ConnectionRefused),
            io::ErrorKind::TimedOut => return failure(FailureCode::Timeout),
            _ => {}
        }
    }

    if err.is_timeout() {
        failure(FailureCode::Timeout)
    } else if err.is_connect() {
        if source_chain(err).any(|e| e.to_string().contains("dns error")) {
            failure(FailureCode::DnsFailure)
        } else {
            failure(FailureCode::Connect)
        }
    } else if err.is_request() || err.is_body() || err.is_decode() {
        failure(FailureCode::Protocol)
    } else {
        failure(FailureCode::Unknown)
    }
}

fn source_chain<'a>(err: &'a (dyn StdError + 'static)) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(err), |&e| e.source())
}

fn io_error_kind(err: &reqwest::Error) -> Option<io::ErrorKind> {
    source_chain(err)
        .find_map(|e| e.downcast_ref::<io::Error>())
        .map(io::Error::kind)
}
