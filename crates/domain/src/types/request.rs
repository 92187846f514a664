//! Request descriptions handed to the pipeline

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::trace::TraceContext;
use crate::impl_wire_str_conversions;

/// HTTP verbs the API uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl_wire_str_conversions!(HttpMethod {
    Get => "GET",
    Post => "POST",
    Put => "PUT",
    Delete => "DELETE",
});

impl HttpMethod {
    /// Repeating the request leaves the server in the same state
    #[must_use]
    pub const fn is_idempotent(self) -> bool {
        !matches!(self, Self::Post)
    }
}

/// Read-through/write-through cache slot for a GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    /// Logical key under the `cache:` prefix
    pub key: String,
    /// Lifetime of the cached response; `None` keeps it until invalidated
    pub ttl: Option<Duration>,
}

/// Immutable description of one call
///
/// The pipeline clones this before running interceptors, so the caller's
/// instance is never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
    /// Relative resource path (`notes/42`) or absolute `http(s)://` URL
    pub url: String,
    pub method: HttpMethod,
    pub body: Option<Value>,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    /// Overrides the pipeline default when set
    pub timeout: Option<Duration>,
    pub use_loading_indicator: bool,
    /// Business codes that are classified but never shown to the user
    pub silenced_codes: BTreeSet<i64>,
    /// Suppress every presentation; auth redirects still happen
    pub silent: bool,
    /// Caller-supplied trace context for this one logical call
    pub trace_context: Option<TraceContext>,
    pub cache: Option<CachePolicy>,
    pub idempotency_key: Option<String>,
}

impl RequestConfig {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            body: None,
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            timeout: None,
            use_loading_indicator: true,
            silenced_codes: BTreeSet::new(),
            silent: false,
            trace_context: None,
            cache: None,
            idempotency_key: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, url).with_body(body)
    }

    pub fn put(url: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Put, url).with_body(body)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, url)
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub const fn without_loading_indicator(mut self) -> Self {
        self.use_loading_indicator = false;
        self
    }

    #[must_use]
    pub fn silence_code(mut self, code: i64) -> Self {
        self.silenced_codes.insert(code);
        self
    }

    /// Background call: no presentation and no loading indicator
    #[must_use]
    pub const fn silent(mut self) -> Self {
        self.silent = true;
        self.use_loading_indicator = false;
        self
    }

    #[must_use]
    pub fn with_trace_context(mut self, trace: TraceContext) -> Self {
        self.trace_context = Some(trace);
        self
    }

    #[must_use]
    pub fn cached(mut self, key: impl Into<String>, ttl: Option<Duration>) -> Self {
        self.cache = Some(CachePolicy { key: key.into(), ttl });
        self
    }

    #[must_use]
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults_show_loading_and_surface_errors() {
        let config = RequestConfig::get("books");
        assert!(config.use_loading_indicator);
        assert!(!config.silent);
        assert!(config.silenced_codes.is_empty());
        assert_eq!(config.method, HttpMethod::Get);
    }

    #[test]
    fn silent_also_drops_loading_indicator() {
        let config = RequestConfig::post("notes", json!({"text": "hi"})).silent();
        assert!(config.silent);
        assert!(!config.use_loading_indicator);
        assert_eq!(config.body, Some(json!({"text": "hi"})));
    }

    #[test]
    fn only_post_is_non_idempotent() {
        assert!(HttpMethod::Get.is_idempotent());
        assert!(HttpMethod::Put.is_idempotent());
        assert!(HttpMethod::Delete.is_idempotent());
        assert!(!HttpMethod::Post.is_idempotent());
        assert_eq!("put".parse::<HttpMethod>(), Ok(HttpMethod::Put));
    }
}
