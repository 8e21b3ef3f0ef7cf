//! Error classification and error responses at the gateway boundary.
//!
//! Every failure on the routing + forwarding path ends up here as a
//! [`GatewayError`]. [`ErrorKind`] is the closed taxonomy the status code,
//! body shape, and log level are derived from.

use std::any::Any;

use axum::{
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::http::rewrite::RewriteError;
use crate::http::transport::TransportError;
use crate::routing::RouteError;

/// Body returned for any failure that is not otherwise classified.
pub const UNCLASSIFIED_MESSAGE: &str = "An error occurred while making the proxy call";

/// Plain-text body returned when the backend cannot be reached.
pub const TRANSPORT_FAILURE_MESSAGE: &str = "An error occurred while proxying the request";

/// Failure kinds resolved at the gateway boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingServiceName,
    MissingRoutingInfo,
    UnknownService,
    TransportReset,
    TransportFailure,
    UnclassifiedFailure,
}

impl ErrorKind {
    /// HTTP status sent to the caller.
    pub fn status_code(self) -> StatusCode {
        match self {
            // Kept at 500 for compatibility with existing callers
            ErrorKind::MissingServiceName => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::MissingRoutingInfo => StatusCode::NOT_FOUND,
            ErrorKind::UnknownService => StatusCode::NOT_FOUND,
            ErrorKind::TransportReset => StatusCode::BAD_GATEWAY,
            ErrorKind::TransportFailure => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::UnclassifiedFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Anything that can go wrong between receiving a request and relaying the
/// backend's response.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Route(RouteError::MissingServiceName) => ErrorKind::MissingServiceName,
            GatewayError::Route(RouteError::MissingRoutingInfo { .. }) => {
                ErrorKind::MissingRoutingInfo
            }
            GatewayError::Route(RouteError::UnknownService(_)) => ErrorKind::UnknownService,
            GatewayError::Transport(TransportError::Reset) => ErrorKind::TransportReset,
            GatewayError::Transport(TransportError::Failure { .. }) => ErrorKind::TransportFailure,
            GatewayError::Rewrite(_) | GatewayError::Body(_) => ErrorKind::UnclassifiedFailure,
        }
    }

    /// Log the failure at the level its kind calls for.
    pub fn log(&self, method: &Method, path: &str, request_id: &str) {
        match self.kind() {
            ErrorKind::MissingServiceName | ErrorKind::UnknownService => {
                tracing::warn!(request_id = %request_id, "{}", self);
            }
            ErrorKind::MissingRoutingInfo => {
                tracing::error!(request_id = %request_id, "{}", self);
            }
            ErrorKind::TransportReset => {
                tracing::debug!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    "Upstream connection reset"
                );
            }
            ErrorKind::TransportFailure => {
                let code = match self {
                    GatewayError::Transport(TransportError::Failure { code, .. }) => code.as_str(),
                    _ => "EUNKNOWN",
                };
                tracing::error!(
                    request_id = %request_id,
                    code = code,
                    error = %self,
                    "Error {} while proxying {} {}",
                    code,
                    method,
                    path
                );
            }
            ErrorKind::UnclassifiedFailure => {
                tracing::error!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    error = ?self,
                    "{}",
                    UNCLASSIFIED_MESSAGE
                );
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = kind.status_code();
        match kind {
            ErrorKind::MissingServiceName
            | ErrorKind::MissingRoutingInfo
            | ErrorKind::UnknownService => json_error(status, self.to_string()),
            // Backend-side reset only; a caller that went away drops the
            // handler future and never gets here
            ErrorKind::TransportReset => status.into_response(),
            ErrorKind::TransportFailure => (
                status,
                [(header::CONTENT_TYPE, "text/plain")],
                TRANSPORT_FAILURE_MESSAGE,
            )
                .into_response(),
            ErrorKind::UnclassifiedFailure => json_error(status, UNCLASSIFIED_MESSAGE),
        }
    }
}

fn json_error(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: error.into(),
        }),
    )
        .into_response()
}

/// Response for a panic caught at the boundary.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = %detail, "{}", UNCLASSIFIED_MESSAGE);

    json_error(StatusCode::INTERNAL_SERVER_ERROR, UNCLASSIFIED_MESSAGE)
}
