//! # Request Context
//!
//! The request context is the router's own representation of an HTTP
//! exchange. A [`RequestContext`] bundles the [`Request`], the [`Response`]
//! buffers, a flat key/value map that middleware uses to hand data to
//! handlers, and the path parameters captured by the router.
//!
//! ## Lifecycle
//!
//! The server keeps one context per connection and calls
//! [`RequestContext::reset`] between requests, so the underlying buffers are
//! reused for throughput. Anything borrowed from a context is only valid
//! until the handler chain returns.
//!
//! ```rust
//! use brrtrouter_pprof::context::RequestContext;
//!
//! let mut ctx = RequestContext::new();
//! ctx.request.set_request_uri("/debug/pprof/heap?debug=1");
//! ctx.set("user", "alice");
//! ctx.string(200, "ok");
//!
//! assert_eq!(ctx.get("user").and_then(|v| v.as_str()), Some("alice"));
//! assert_eq!(ctx.response.body(), b"ok");
//! ```

mod request;
mod response;

pub use request::Request;
pub use response::Response;

use crate::ids::RequestId;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

/// Maximum inline headers before heap allocation
/// Most requests have ≤16 headers (JSF: no heap in hot path)
pub const MAX_INLINE_HEADERS: usize = 16;

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Ordered header storage; names keep their original case.
pub type HeaderVec = SmallVec<[(String, String); MAX_INLINE_HEADERS]>;

/// Path parameter storage.
///
/// Param names use `Arc<str>` because they come from the static route tree
/// and are shared by every request that matches the route.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Per-request state handed to every middleware and handler.
#[derive(Debug, Default)]
pub struct RequestContext {
    /// Incoming request
    pub request: Request,
    /// Outgoing response buffers
    pub response: Response,
    keys: HashMap<String, Value>,
    params: ParamVec,
    request_id: RequestId,
    aborted: bool,
}

impl RequestContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the context to its initial state, keeping buffer capacity.
    pub fn reset(&mut self) {
        self.request.reset();
        self.response.reset();
        self.keys.clear();
        self.params.clear();
        self.request_id = RequestId::new();
        self.aborted = false;
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn set_request_id(&mut self, id: RequestId) {
        self.request_id = id;
    }

    /// Store a value for later middleware or handlers.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.keys.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.keys.get(key)
    }

    /// Visit every stored key/value pair.
    pub fn for_each_key<F>(&self, mut f: F)
    where
        F: FnMut(&str, &Value),
    {
        for (k, v) in &self.keys {
            f(k, v);
        }
    }

    #[must_use]
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics when a name repeats at different
    /// depths of the route.
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn params(&self) -> &ParamVec {
        &self.params
    }

    pub(crate) fn set_params(&mut self, params: ParamVec) {
        self.params = params;
    }

    /// Write a plain-text response.
    pub fn string(&mut self, status: u16, body: &str) {
        self.response.set_status_code(status);
        self.response
            .set_content_type("text/plain; charset=utf-8");
        self.response.set_body(body.as_bytes());
    }

    /// Write a JSON response.
    pub fn json(&mut self, status: u16, value: &Value) {
        self.response.set_status_code(status);
        self.response.set_content_type("application/json");
        match serde_json::to_vec(value) {
            Ok(body) => self.response.set_body(&body),
            Err(err) => {
                tracing::error!(error = %err, "Failed to serialize JSON response");
                self.string(500, "Internal Server Error");
            }
        }
    }

    /// Stop the handler chain and answer with `status`.
    pub fn abort_with_status(&mut self, status: u16) {
        self.response.set_status_code(status);
        self.aborted = true;
    }

    /// Stop the handler chain without touching the response.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_round_trip() {
        let mut ctx = RequestContext::new();
        ctx.set("contextKey", "contextValue");
        ctx.set("n", 3);
        assert_eq!(ctx.get("contextKey"), Some(&Value::from("contextValue")));

        let mut seen = Vec::new();
        ctx.for_each_key(|k, _| seen.push(k.to_string()));
        seen.sort();
        assert_eq!(seen, vec!["contextKey", "n"]);
    }

    #[test]
    fn test_json_response() {
        let mut ctx = RequestContext::new();
        ctx.json(200, &serde_json::json!({"ping": "pong"}));
        assert_eq!(ctx.response.content_type(), Some("application/json"));
        assert_eq!(ctx.response.body(), br#"{"ping":"pong"}"#);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut ctx = RequestContext::new();
        let first_id = ctx.request_id();
        ctx.set("k", "v");
        ctx.request.set_method("POST");
        ctx.abort_with_status(403);
        ctx.reset();
        assert_eq!(ctx.key_count(), 0);
        assert_eq!(ctx.request.method(), "GET");
        assert_eq!(ctx.response.status_code(), 200);
        assert!(!ctx.is_aborted());
        assert_ne!(ctx.request_id(), first_id);
    }

    #[test]
    fn test_param_last_write_wins() {
        let mut ctx = RequestContext::new();
        let mut params = ParamVec::new();
        params.push((Arc::from("id"), "org".to_string()));
        params.push((Arc::from("id"), "user".to_string()));
        ctx.set_params(params);
        assert_eq!(ctx.param("id"), Some("user"));
    }

    #[test]
    fn test_string_sets_plain_text() {
        let mut ctx = RequestContext::new();
        ctx.string(500, "Internal Server Error");
        assert_eq!(ctx.response.status_code(), 500);
        assert_eq!(
            ctx.response.content_type(),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(ctx.response.body(), b"Internal Server Error");
    }
}
