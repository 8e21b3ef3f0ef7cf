//! Cookie allow-list filtering.
//!
//! Only cookies named in the allow-list cross from the caller to a backend.
//! An empty allow-list forwards nothing.

use axum::http::{header, HeaderMap};

/// Ordered set of cookie names permitted to reach backends.
#[derive(Debug, Clone, Default)]
pub struct CookiePolicy {
    allowed: Vec<String>,
}

impl CookiePolicy {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    /// Filter a raw `cookie` header value down to the allowed pairs.
    pub fn filter(&self, raw: &str) -> String {
        filter_cookies(raw, &self.allowed)
    }

    /// Replace the `cookie` header(s) in `headers` with the allowed subset.
    ///
    /// Multiple header lines are treated as one list. The header is removed
    /// when nothing survives.
    pub fn apply(&self, headers: &mut HeaderMap) {
        let raw = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join("; ");
        headers.remove(header::COOKIE);

        let filtered = self.filter(&raw);
        if filtered.is_empty() {
            return;
        }
        if let Ok(value) = filtered.parse() {
            headers.insert(header::COOKIE, value);
        }
    }
}

/// Keep the `name=value` pairs of `raw` whose trimmed name is in `allowed`.
///
/// Pairs are trimmed and joined with `;` in their original order.
pub fn filter_cookies<S: AsRef<str>>(raw: &str, allowed: &[S]) -> String {
    if raw.is_empty() || allowed.is_empty() {
        return String::new();
    }

    raw.split(';')
        .map(str::trim)
        .filter(|pair| {
            let name = pair.split('=').next().unwrap_or_default().trim();
            allowed.iter().any(|a| a.as_ref() == name)
        })
        .collect::<Vec<_>>()
        .join(";")
}
