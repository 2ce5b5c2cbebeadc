//! # Adaptor
//!
//! Runs handlers written against the `http` crate's request type and a
//! writer-style response interface inside the router's pipeline.
//!
//! The router hands every handler a pooled [`RequestContext`]. Handlers
//! produced by [`adapt`] build an owned `http::Request<Body>` from it,
//! give the wrapped handler a [`ResponseWriter`] that writes straight into
//! the context's response buffers, and afterwards infer a `Content-Type` from
//! the body when the handler did not set one.
//!
//! ## Example
//!
//! ```rust
//! use brrtrouter_pprof::adaptor::{adapt, CompatRequest, CompatRequestExt, ResponseWriter};
//! use brrtrouter_pprof::context::RequestContext;
//! use std::io::Write;
//!
//! let handler = adapt(|w: &mut dyn ResponseWriter, req: CompatRequest| {
//!     let user = req
//!         .context_value("user")
//!         .and_then(|v| v.as_str())
//!         .unwrap_or("anonymous")
//!         .to_string();
//!     let _ = write!(w, "<html><body>hello {user}</body></html>");
//! });
//!
//! let mut ctx = RequestContext::new();
//! ctx.set("user", "alice");
//! handler(&mut ctx);
//!
//! assert_eq!(ctx.response.status_code(), 200);
//! assert_eq!(ctx.response.content_type(), Some("text/html; charset=utf-8"));
//! ```
//!
//! ## Lifetimes
//!
//! The request view owns copies of everything it exposes and the writer
//! borrows the response mutably for the duration of one call, so neither can
//! outlive the pooled context it was built from.
//!
//! ## Errors
//!
//! When the request cannot be represented as an `http::Request` (invalid
//! method, URI, protocol or header), the wrapped handler is not called and
//! the response becomes `500 Internal Server Error`. Panics inside the
//! handler are left to the router's recovery.

pub mod cookie;
mod request;
mod response;
pub mod sniff;

use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use tracing::error;

use crate::context::RequestContext;
use crate::router::HandlerFunc;

pub use cookie::{set_cookie, Cookie, SameSite};
pub use request::{compat_request, Body, CompatRequest, CompatRequestExt, Context, RequestUri};
pub use response::{canonical_header_key, CompatResponseWriter, ResponseWriter};
pub use sniff::detect_content_type;

/// Failure to express the router's request as an `http::Request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    InvalidMethod(String),
    InvalidUri(String),
    UnsupportedVersion(String),
    InvalidHeaderName(String),
    /// Carries the header name; values may be sensitive.
    InvalidHeaderValue(String),
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::InvalidMethod(m) => write!(f, "invalid method {m:?}"),
            ConversionError::InvalidUri(u) => write!(f, "invalid request URI {u:?}"),
            ConversionError::UnsupportedVersion(v) => {
                write!(f, "unsupported protocol version {v:?}")
            }
            ConversionError::InvalidHeaderName(n) => write!(f, "invalid header name {n:?}"),
            ConversionError::InvalidHeaderValue(n) => {
                write!(f, "invalid value for header {n:?}")
            }
        }
    }
}

impl std::error::Error for ConversionError {}

/// A handler written against the `http` request model.
pub trait HttpHandler: Send + Sync {
    fn serve_http(&self, w: &mut dyn ResponseWriter, req: CompatRequest);
}

impl<F> HttpHandler for F
where
    F: Fn(&mut dyn ResponseWriter, CompatRequest) + Send + Sync,
{
    fn serve_http(&self, w: &mut dyn ResponseWriter, req: CompatRequest) {
        self(w, req)
    }
}

/// Wrap `handler` so it can be registered on the router.
pub fn adapt<H>(handler: H) -> HandlerFunc
where
    H: HttpHandler + 'static,
{
    Arc::new(move |ctx: &mut RequestContext| serve_compat(&handler, ctx))
}

/// Like [`adapt`] for a handler that is already shared.
pub fn adapt_shared(handler: Arc<dyn HttpHandler>) -> HandlerFunc {
    Arc::new(move |ctx: &mut RequestContext| serve_compat(handler.as_ref(), ctx))
}

/// Run `handler` against `ctx` once.
///
/// This is the body of every handler returned by [`adapt`].
pub fn serve_compat(handler: &dyn HttpHandler, ctx: &mut RequestContext) {
    let req = match compat_request(ctx) {
        Ok(req) => req,
        Err(err) => {
            error!(
                request_id = %ctx.request_id(),
                method = %ctx.request.method(),
                uri = %ctx.request.request_uri(),
                error = %err,
                "Failed to convert request for http handler"
            );
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            ctx.string(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Internal Server Error"),
            );
            return;
        }
    };

    let mut writer = CompatResponseWriter::new(&mut ctx.response);
    handler.serve_http(&mut writer, req);
    writer.finish();

    if ctx.response.content_type().map_or(true, str::is_empty) {
        let content_type = detect_content_type(ctx.response.body());
        ctx.response.set_content_type(content_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use std::io::{Read, Write};

    #[test]
    fn test_explicit_content_type_is_kept() {
        let handler = adapt(|w: &mut dyn ResponseWriter, _req: CompatRequest| {
            w.header()
                .insert("Content-Type", HeaderValue::from_static("application/json"));
            let _ = w.write_all(b"<html>not really</html>");
        });
        let mut ctx = RequestContext::new();
        handler(&mut ctx);
        assert_eq!(ctx.response.content_type(), Some("application/json"));
    }

    #[test]
    fn test_empty_content_type_is_sniffed() {
        let handler = adapt(|w: &mut dyn ResponseWriter, _req: CompatRequest| {
            w.header()
                .insert("Content-Type", HeaderValue::from_static(""));
            let _ = w.write_all(b"<!doctype html><html>");
        });
        let mut ctx = RequestContext::new();
        handler(&mut ctx);
        assert_eq!(
            ctx.response.content_type(),
            Some("text/html; charset=utf-8")
        );
    }

    #[test]
    fn test_conversion_failure_skips_handler() {
        let handler = adapt(|_w: &mut dyn ResponseWriter, _req: CompatRequest| {
            panic!("handler must not run");
        });
        let mut ctx = RequestContext::new();
        ctx.request.set_protocol("HTTP/9");
        handler(&mut ctx);
        assert_eq!(ctx.response.status_code(), 500);
        assert_eq!(ctx.response.body(), b"Internal Server Error");
    }

    #[test]
    fn test_echo_body_and_status() {
        let handler = adapt(|w: &mut dyn ResponseWriter, mut req: CompatRequest| {
            let mut body = Vec::new();
            let _ = req.body_mut().read_to_end(&mut body);
            w.header().insert("Header1", HeaderValue::from_static("value1"));
            w.write_header(StatusCode::BAD_REQUEST);
            let _ = w.write_all(&body);
        });
        let mut ctx = RequestContext::new();
        ctx.request.set_method("POST");
        ctx.request.set_body(b"<!doctype html><html>");
        handler(&mut ctx);
        assert_eq!(ctx.response.status_code(), 400);
        assert_eq!(ctx.response.header("header1"), Some("value1"));
        assert_eq!(ctx.response.body(), b"<!doctype html><html>");
        assert_eq!(
            ctx.response.content_type(),
            Some("text/html; charset=utf-8")
        );
    }

    #[test]
    fn test_conversion_error_display() {
        let err = ConversionError::InvalidMethod("GE T".into());
        assert_eq!(err.to_string(), "invalid method \"GE T\"");
    }
}
