//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Every service maps to an absolute http(s) URL
//! - Header names and cookie names are usable on the wire
//! - Validate value ranges (timeouts > 0, body limit > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("service '{service}' has invalid URL '{url}': {reason}")]
    ServiceUrl {
        service: String,
        url: String,
        reason: String,
    },

    #[error("invalid header name '{0}'")]
    HeaderName(String),

    #[error("invalid value for header '{0}'")]
    HeaderValue(String),

    #[error("target parameter name must not be empty")]
    EmptyTargetParam,

    #[error("invalid cookie name '{0}'")]
    CookieName(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Check a loaded configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    for (name, url) in &config.services {
        if name.is_empty() {
            errors.push(ValidationError::EmptyServiceName);
        }
        if let Err(reason) = check_service_url(url) {
            errors.push(ValidationError::ServiceUrl {
                service: name.clone(),
                url: url.clone(),
                reason,
            });
        }
    }

    if HeaderName::from_bytes(config.routing.service_header.as_bytes()).is_err() {
        errors.push(ValidationError::HeaderName(
            config.routing.service_header.clone(),
        ));
    }
    if config.routing.target_param.is_empty() {
        errors.push(ValidationError::EmptyTargetParam);
    }

    for (name, value) in &config.proxy.headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::HeaderName(name.clone()));
        } else if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::HeaderValue(name.clone()));
        }
    }

    for cookie in &config.cookies.allowed {
        if cookie.trim().is_empty() || cookie.contains(['=', ';']) {
            errors.push(ValidationError::CookieName(cookie.clone()));
        }
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero("security.max_body_size"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_service_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme '{}'", other)),
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}
