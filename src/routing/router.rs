//! Route resolution.
//!
//! # Responsibilities
//! - Read the service name header and the target override
//! - Resolve the service name through the registry
//! - Compose the final target URL (base + prefix + target)
//! - Extract the bearer token
//! - Return a decision or an explicit, classified failure
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Pure function of the request view and configuration
//! - Empty header/query values count as absent

use axum::http::{header, HeaderMap, HeaderName, Method};
use thiserror::Error;

use crate::config::RoutingConfig;
use crate::routing::path::concat_path;
use crate::routing::registry::ServiceRegistry;

/// Routing-relevant view of an inbound request.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub method: Method,
    /// Path captured by the catch-all route, without its leading slash.
    pub prefix: String,
    /// Raw query string, if any.
    pub query: Option<String>,
    pub headers: HeaderMap,
}

impl RouteRequest {
    /// Build the view from request parts.
    pub fn from_parts(parts: &axum::http::request::Parts) -> Self {
        Self {
            method: parts.method.clone(),
            prefix: parts.uri.path().trim_start_matches('/').to_string(),
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers.clone(),
        }
    }

    /// First non-empty, percent-decoded value of query parameter `name`.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, value)| key == name && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    }

    fn header_str(&self, name: &HeaderName) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    }
}

/// Successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    /// Service the request was resolved for.
    pub service: String,
    /// Absolute backend URL the request is sent to.
    pub target_url: String,
    /// The caller's `authorization` value as received, if any.
    pub token: Option<String>,
}

/// Classified routing failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// A target override was given without identifying a service.
    #[error("Cannot make a proxy call without a service name")]
    MissingServiceName,

    /// Neither a service name nor a target override.
    #[error("Could not find '{target_param}' or '{service_header}'")]
    MissingRoutingInfo {
        target_param: String,
        service_header: String,
    },

    /// Service name absent from the registry.
    #[error("Could not find service name {0}")]
    UnknownService(String),
}

/// Resolves inbound requests to backend targets.
#[derive(Debug, Clone)]
pub struct Router {
    registry: ServiceRegistry,
    service_header: HeaderName,
    target_param: String,
}

impl Router {
    /// Create a router over `registry`, reading routing inputs as configured.
    ///
    /// An unusable header name falls back to `x-service-name`; configuration
    /// validation rejects such names before this point.
    pub fn new(registry: ServiceRegistry, routing: &RoutingConfig) -> Self {
        let service_header = HeaderName::from_bytes(routing.service_header.as_bytes())
            .unwrap_or_else(|_| HeaderName::from_static("x-service-name"));
        Self {
            registry,
            service_header,
            target_param: routing.target_param.clone(),
        }
    }

    /// Resolve a request to a target URL and token.
    pub fn route(&self, request: &RouteRequest) -> Result<RouteDecision, RouteError> {
        let target = request.query_param(&self.target_param);
        let service_name = request.header_str(&self.service_header);

        let Some(service_name) = service_name else {
            return Err(match target {
                Some(_) => RouteError::MissingServiceName,
                None => RouteError::MissingRoutingInfo {
                    target_param: self.target_param.clone(),
                    service_header: self.service_header.to_string(),
                },
            });
        };

        let base_url = self
            .registry
            .resolve(service_name)
            .ok_or_else(|| RouteError::UnknownService(service_name.to_string()))?;

        let target_url = match target {
            Some(target) => concat_path(&[base_url, &request.prefix, &target]),
            None => base_url.to_string(),
        };

        Ok(RouteDecision {
            service: service_name.to_string(),
            target_url,
            token: bearer_token(&request.headers),
        })
    }
}

/// Credential carried by the `authorization` header, verbatim.
///
/// Empty and non-UTF-8 values yield `None`.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
