//! Service name lookup.
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Exact, case-sensitive lookup; no trailing-slash normalization

use std::collections::HashMap;

/// Mapping from logical service name to backend base URL.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, String>,
}

impl ServiceRegistry {
    /// Build a registry from `(name, base_url)` pairs. Later duplicates win.
    pub fn new<I, K, V>(services: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            services: services
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Base URL registered for `service_name`, if any.
    pub fn resolve(&self, service_name: &str) -> Option<&str> {
        self.services.get(service_name).map(String::as_str)
    }

}
