//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! adapter builds `HttpRequest` values and interprets `ResponseMeta` plus a
//! raw body without ever touching the network itself; the injected transport
//! executes the actual I/O.
//!
//! All fields use owned types (`String`, `Vec`, `serde_json::Value`) so a
//! descriptor can be handed to a transport running on another thread.

use std::fmt;

use serde_json::{Map, Value};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const METHOD_OVERRIDE: &str = "X-HTTP-Method-Override";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Methods that legacy servers may reject and that HTTP emulation
    /// tunnels through `POST`.
    pub fn needs_emulation(self) -> bool {
        matches!(self, HttpMethod::Put | HttpMethod::Patch | HttpMethod::Delete)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered header list with case-insensitive keys.
///
/// Inserting a name that is already present (in any casing) replaces the
/// earlier entry in place, taking the new spelling of the name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(entry) => *entry = (name, value),
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Merge `other` into `self`; entries from `other` win.
    pub fn extend(&mut self, other: &Headers) {
        for (name, value) in other.iter() {
            self.insert(name, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<(String, String)> {
        self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

/// Request payload. A request carries at most one of the two encodings.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Raw JSON, serialized by the transport.
    Json(Value),
    /// An already form-urlencoded string.
    Form(String),
}

impl RequestBody {
    /// The body as it goes on the wire.
    pub fn encode(&self) -> String {
        match self {
            RequestBody::Json(value) => value.to_string(),
            RequestBody::Form(encoded) => encoded.clone(),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            RequestBody::Json(value) => Some(value),
            RequestBody::Form(_) => None,
        }
    }

    pub fn as_form(&self) -> Option<&str> {
        match self {
            RequestBody::Json(_) => None,
            RequestBody::Form(encoded) => Some(encoded),
        }
    }
}

/// An HTTP request described as plain data.
///
/// Built by `SyncAdapter::build_request`. The transport is responsible for
/// executing it and reporting back through a `Completion`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: Option<RequestBody>,
    /// Cross-domain request flag (XDomainRequest on old browsers).
    pub use_xdr: bool,
    /// Raw transport fields, e.g. `withCredentials`.
    pub xhr_fields: Map<String, Value>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
            body: None,
            use_xdr: false,
            xhr_fields: Map::new(),
        }
    }

    pub fn json(&self) -> Option<&Value> {
        self.body.as_ref().and_then(RequestBody::as_json)
    }

    pub fn form(&self) -> Option<&str> {
        self.body.as_ref().and_then(RequestBody::as_form)
    }
}

/// Response metadata reported by the transport alongside the raw body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: u16,
    pub headers: Headers,
}

impl ResponseMeta {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// 2xx, or 304 Not Modified.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) || self.status == 304
    }

    /// Whether the body should be read as JSON. A response without a
    /// content type is assumed to be JSON.
    pub fn expects_json(&self) -> bool {
        match self.headers.get(CONTENT_TYPE) {
            Some(content_type) => {
                let mime = content_type
                    .split(';')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_ascii_lowercase();
                mime == JSON_CONTENT_TYPE || mime.ends_with("+json")
            }
            None => true,
        }
    }
}

/// A settled response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Empty,
}

impl ResponseBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Text(text) => Some(text),
            _ => None,
        }
    }
}
