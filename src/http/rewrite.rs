//! Outbound request construction.
//!
//! # Responsibilities
//! - Point the request at the resolved target URL
//! - Apply default headers, the bearer token, and header overrides
//! - Filter cookies through the allow-list
//! - Re-encode JSON and form bodies
//!
//! # Design Decisions
//! - Pure function of inbound request, route decision, and configuration
//! - Header order of precedence: inbound < defaults < overrides; the cookie
//!   policy runs last and always owns `cookie`
//! - Unknown content types are forwarded byte-for-byte

use axum::{
    body::Bytes,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method},
};
use thiserror::Error;
use url::Url;

use crate::config::ProxyOptions;
use crate::routing::RouteDecision;
use crate::security::headers::strip_hop_by_hop;
use crate::security::CookiePolicy;

const APPLICATION_JSON: &str = "application/json";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// The request handed to the transport.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl OutboundRequest {
    /// Path and query the backend sees.
    pub fn path_and_query(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("invalid target URL '{url}': {source}")]
    InvalidTarget {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("token is not a valid header value")]
    InvalidToken,

    #[error("failed to encode body: {0}")]
    Encode(#[from] serde_json::Error),
}

/// How a body is re-encoded before forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    Json,
    Form,
    Passthrough,
}

impl BodyEncoding {
    /// Pick the encoding for a `content-type` value, ignoring parameters.
    pub fn for_content_type(content_type: Option<&str>) -> Self {
        let essence = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase());
        match essence.as_deref() {
            Some(APPLICATION_JSON) => BodyEncoding::Json,
            Some(FORM_URLENCODED) => BodyEncoding::Form,
            _ => BodyEncoding::Passthrough,
        }
    }
}

/// Builds outbound requests from inbound ones.
#[derive(Debug, Clone, Default)]
pub struct RequestRewriter {
    cookies: CookiePolicy,
    overrides: HeaderMap,
    change_origin: bool,
}

impl RequestRewriter {
    /// Create a rewriter. Override headers that are not valid on the wire are
    /// skipped with a warning.
    pub fn new(cookies: CookiePolicy, options: &ProxyOptions) -> Self {
        let mut overrides = HeaderMap::new();
        for (name, value) in &options.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    overrides.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "Ignoring invalid override header"),
            }
        }

        Self {
            cookies,
            overrides,
            change_origin: options.change_origin,
        }
    }

    /// Produce the outbound request for `decision`.
    pub fn rewrite(
        &self,
        method: Method,
        mut headers: HeaderMap,
        body: Bytes,
        decision: &RouteDecision,
    ) -> Result<OutboundRequest, RewriteError> {
        let url = Url::parse(&decision.target_url).map_err(|source| RewriteError::InvalidTarget {
            url: decision.target_url.clone(),
            source,
        })?;

        strip_hop_by_hop(&mut headers);
        if self.change_origin {
            headers.remove(header::HOST);
        }

        let accept_is_default = headers
            .get(header::ACCEPT)
            .map(|v| v.as_bytes() == b"*/*")
            .unwrap_or(true);
        if accept_is_default {
            headers.insert(header::ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
        }
        if !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        }

        if let Some(value) = decision.token.as_deref().and_then(bearer_authorization) {
            let value = HeaderValue::from_str(&value).map_err(|_| RewriteError::InvalidToken)?;
            headers.insert(header::AUTHORIZATION, value);
        }

        for (name, value) in &self.overrides {
            headers.insert(name.clone(), value.clone());
        }

        self.cookies.apply(&mut headers);

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let body = match encode_body(BodyEncoding::for_content_type(content_type), &body)? {
            Some(encoded) => {
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(encoded.len()));
                encoded
            }
            None => body,
        };

        Ok(OutboundRequest {
            method,
            url,
            headers,
            body,
        })
    }
}

/// Outbound `authorization` value for `token`.
///
/// A leading `Bearer` scheme on the token (any case) is not repeated. `None`
/// when no credential follows the scheme; the inbound header is then left
/// untouched.
pub fn bearer_authorization(token: &str) -> Option<String> {
    let token = token.trim();
    let credential = match token.get(..6) {
        Some(scheme)
            if scheme.eq_ignore_ascii_case("bearer")
                && token[6..].chars().next().map_or(true, char::is_whitespace) =>
        {
            token[6..].trim_start()
        }
        _ => token,
    };
    if credential.is_empty() {
        None
    } else {
        Some(format!("Bearer {}", credential))
    }
}

/// Re-encode `body` for `encoding`.
///
/// Returns `None` when the body is forwarded as-is: empty bodies, bodies that
/// do not parse under their declared type, and pass-through content types.
pub fn encode_body(encoding: BodyEncoding, body: &[u8]) -> Result<Option<Bytes>, RewriteError> {
    if body.is_empty() {
        return Ok(None);
    }

    match encoding {
        BodyEncoding::Json => {
            let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) else {
                return Ok(None);
            };
            if is_empty_json(&value) {
                return Ok(None);
            }
            Ok(Some(Bytes::from(serde_json::to_vec(&value)?)))
        }
        BodyEncoding::Form => {
            let pairs: Vec<(String, String)> = url::form_urlencoded::parse(body)
                .into_owned()
                .collect();
            if pairs.is_empty() {
                return Ok(None);
            }
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish();
            Ok(Some(Bytes::from(encoded)))
        }
        BodyEncoding::Passthrough => Ok(None),
    }
}

fn is_empty_json(value: &serde_json::Value) -> bool {
    use serde_json::Value;
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decision(target_url: &str, token: Option<&str>) -> RouteDecision {
        RouteDecision {
            service: "dog".into(),
            target_url: target_url.into(),
            token: token.map(str::to_string),
        }
    }

    fn rewriter(allowed: &[&str]) -> RequestRewriter {
        RequestRewriter::new(
            CookiePolicy::new(allowed.iter().copied()),
            &ProxyOptions::default(),
        )
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn test_targets_resolved_url_and_filters_cookies() {
        let out = rewriter(&["session"])
            .rewrite(
                Method::GET,
                headers(&[("cookie", "session=abc; tracker=xyz"), ("host", "gateway.local")]),
                Bytes::new(),
                &decision("https://dog.api/breeds?limit=5", None),
            )
            .unwrap();

        assert_eq!(out.url.as_str(), "https://dog.api/breeds?limit=5");
        assert_eq!(out.path_and_query(), "/breeds?limit=5");
        assert_eq!(out.headers[header::COOKIE], "session=abc");
        assert!(out.headers.get(header::HOST).is_none());
        assert!(out.headers.get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn test_defaults_only_when_absent_or_wildcard() {
        let rw = rewriter(&[]);
        let d = decision("https://dog.api", None);

        let out = rw.rewrite(Method::GET, HeaderMap::new(), Bytes::new(), &d).unwrap();
        assert_eq!(out.headers[header::ACCEPT], APPLICATION_JSON);
        assert_eq!(out.headers[header::CONTENT_TYPE], APPLICATION_JSON);

        let out = rw
            .rewrite(Method::GET, headers(&[("accept", "*/*")]), Bytes::new(), &d)
            .unwrap();
        assert_eq!(out.headers[header::ACCEPT], APPLICATION_JSON);

        let out = rw
            .rewrite(
                Method::GET,
                headers(&[("accept", "text/html"), ("content-type", "text/plain")]),
                Bytes::new(),
                &d,
            )
            .unwrap();
        assert_eq!(out.headers[header::ACCEPT], "text/html");
        assert_eq!(out.headers[header::CONTENT_TYPE], "text/plain");
    }

    #[test]
    fn test_bearer_token_replaces_inbound_authorization() {
        for token in ["Bearer abc", "abc", "bearer   abc"] {
            let out = rewriter(&[])
                .rewrite(
                    Method::GET,
                    headers(&[("authorization", "Bearer abc")]),
                    Bytes::new(),
                    &decision("https://dog.api", Some(token)),
                )
                .unwrap();
            assert_eq!(out.headers[header::AUTHORIZATION], "Bearer abc", "token {:?}", token);
            assert_eq!(out.headers.get_all(header::AUTHORIZATION).iter().count(), 1);
        }
    }

    #[test]
    fn test_authorization_kept_when_no_credential_extracted() {
        // Scheme without a credential
        let out = rewriter(&[])
            .rewrite(
                Method::GET,
                headers(&[("authorization", "Bearer ")]),
                Bytes::new(),
                &decision("https://dog.api", Some("Bearer ")),
            )
            .unwrap();
        assert_eq!(out.headers[header::AUTHORIZATION], "Bearer ");

        // Not valid UTF-8, so the router extracted nothing
        let mut inbound = HeaderMap::new();
        inbound.insert(
            header::AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xff").unwrap(),
        );
        let out = rewriter(&[])
            .rewrite(Method::GET, inbound, Bytes::new(), &decision("https://dog.api", None))
            .unwrap();
        assert_eq!(out.headers[header::AUTHORIZATION].as_bytes(), b"Bearer \xff");
    }

    #[test]
    fn test_bearer_authorization() {
        assert_eq!(bearer_authorization("abc.def").as_deref(), Some("Bearer abc.def"));
        assert_eq!(bearer_authorization("BEARER abc").as_deref(), Some("Bearer abc"));
        assert_eq!(bearer_authorization("Bearerish").as_deref(), Some("Bearer Bearerish"));
        assert_eq!(bearer_authorization("Bearer"), None);
        assert_eq!(bearer_authorization("  "), None);
    }

    #[test]
    fn test_overrides_win_over_defaults_but_not_cookie_policy() {
        let mut options = ProxyOptions::default();
        for (name, value) in [
            ("accept", "application/xml"),
            ("x-gateway", "edge"),
            ("cookie", "admin=1; session=s"),
        ] {
            options.headers.insert(name.into(), value.into());
        }

        let out = RequestRewriter::new(CookiePolicy::new(["session"]), &options)
            .rewrite(
                Method::GET,
                headers(&[("x-request-id", "r-1")]),
                Bytes::new(),
                &decision("https://dog.api", None),
            )
            .unwrap();

        assert_eq!(out.headers[header::ACCEPT], "application/xml");
        assert_eq!(out.headers["x-gateway"], "edge");
        assert_eq!(out.headers["x-request-id"], "r-1");
        assert_eq!(out.headers[header::CONTENT_TYPE], APPLICATION_JSON);
        assert_eq!(out.headers[header::COOKIE], "session=s");
    }

    #[test]
    fn test_keeps_host_without_change_origin() {
        let options = ProxyOptions {
            change_origin: false,
            ..ProxyOptions::default()
        };
        let out = RequestRewriter::new(CookiePolicy::default(), &options)
            .rewrite(
                Method::GET,
                headers(&[("host", "gateway.local"), ("connection", "close")]),
                Bytes::new(),
                &decision("https://dog.api", None),
            )
            .unwrap();
        assert_eq!(out.headers[header::HOST], "gateway.local");
        assert!(out.headers.get(header::CONNECTION).is_none());
    }

    #[test]
    fn test_json_body_reencoded_with_length() {
        let raw = Bytes::from_static(b"{ \"name\" : \"rex\",\n \"tags\": [1, 2] }");
        let out = rewriter(&[])
            .rewrite(
                Method::POST,
                headers(&[("content-type", "application/json; charset=utf-8"), ("content-length", "37")]),
                raw.clone(),
                &decision("https://dog.api/dogs", None),
            )
            .unwrap();

        let expected = br#"{"name":"rex","tags":[1,2]}"#;
        assert_eq!(&out.body[..], &expected[..]);
        assert_eq!(out.headers[header::CONTENT_LENGTH], expected.len().to_string().as_str());

        let decoded: serde_json::Value = serde_json::from_slice(&out.body).unwrap();
        assert_eq!(decoded, serde_json::from_slice::<serde_json::Value>(&raw).unwrap());
        assert_eq!(decoded, json!({"name": "rex", "tags": [1, 2]}));
    }

    #[test]
    fn test_form_body_round_trips() {
        let out = rewriter(&[])
            .rewrite(
                Method::POST,
                headers(&[("content-type", "application/x-www-form-urlencoded")]),
                Bytes::from_static(b"name=rex%20jr&kind=good+boy"),
                &decision("https://dog.api/dogs", None),
            )
            .unwrap();

        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(&out.body)
            .into_owned()
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("name".to_string(), "rex jr".to_string()),
                ("kind".to_string(), "good boy".to_string()),
            ]
        );
        assert_eq!(
            out.headers[header::CONTENT_LENGTH],
            out.body.len().to_string().as_str()
        );
    }

    #[test]
    fn test_other_content_types_pass_through() {
        let raw = Bytes::from_static(b"<dog name='rex'/>");
        let out = rewriter(&[])
            .rewrite(
                Method::PUT,
                headers(&[("content-type", "application/xml")]),
                raw.clone(),
                &decision("https://dog.api/dogs/1", None),
            )
            .unwrap();
        assert_eq!(out.body, raw);
        assert!(out.headers.get(header::CONTENT_LENGTH).is_none());
        assert_eq!(out.method, Method::PUT);
    }

    #[test]
    fn test_empty_or_invalid_json_not_reencoded() {
        assert_eq!(encode_body(BodyEncoding::Json, b"").unwrap(), None);
        assert_eq!(encode_body(BodyEncoding::Json, b"{}").unwrap(), None);
        assert_eq!(encode_body(BodyEncoding::Json, b"{not json").unwrap(), None);
        assert_eq!(encode_body(BodyEncoding::Form, b"").unwrap(), None);
    }

    #[test]
    fn test_invalid_target_url() {
        let err = rewriter(&[])
            .rewrite(Method::GET, HeaderMap::new(), Bytes::new(), &decision("dog.api/x", None))
            .unwrap_err();
        assert!(matches!(err, RewriteError::InvalidTarget { .. }));
    }

    #[test]
    fn test_encoding_selection() {
        assert_eq!(BodyEncoding::for_content_type(Some("Application/JSON")), BodyEncoding::Json);
        assert_eq!(
            BodyEncoding::for_content_type(Some("application/x-www-form-urlencoded;charset=UTF-8")),
            BodyEncoding::Form
        );
        assert_eq!(BodyEncoding::for_content_type(Some("text/plain")), BodyEncoding::Passthrough);
        assert_eq!(BodyEncoding::for_content_type(None), BodyEncoding::Passthrough);
    }
}
