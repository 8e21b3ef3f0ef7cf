//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Prefix of environment variables that register a service.
pub const SERVICE_ENV_PREFIX: &str = "SERVICE_";

/// Environment variable overriding the listener port.
pub const PORT_ENV: &str = "APP_PORT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid APP_PORT '{0}'")]
    Port(String),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, overlay the process
/// environment, and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let config = match path {
        Some(path) => parse_file(path)?,
        None => GatewayConfig::default(),
    };

    let config = apply_env(config, std::env::vars())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Overlay environment variables onto a configuration.
///
/// `SERVICE_<NAME>=<url>` registers service `<name>` (lowercased), replacing
/// any file entry with the same name. `APP_PORT` replaces the port of the
/// listener bind address.
pub fn apply_env<I>(mut config: GatewayConfig, vars: I) -> Result<GatewayConfig, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        if let Some(name) = key.strip_prefix(SERVICE_ENV_PREFIX) {
            if name.is_empty() {
                continue;
            }
            config.services.insert(name.to_lowercase(), value);
        } else if key == PORT_ENV {
            let port: u16 = value.parse().map_err(|_| ConfigError::Port(value.clone()))?;
            let host = config
                .listener
                .bind_address
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            config.listener.bind_address = format!("{}:{}", host, port);
        }
    }
    Ok(config)
}
