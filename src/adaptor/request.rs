//! Handler-side request view.
//!
//! [`compat_request`] copies a [`RequestContext`]'s request into an
//! `http::Request<Body>`. Everything is copied: the context's buffers are
//! recycled after the handler returns, so the view must own its data.

use std::collections::HashMap;
use std::io::{self, Read};

use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri, Version};
use serde_json::Value;

use super::cookie::{read_cookies, Cookie};
use super::ConversionError;
use crate::context::RequestContext;
use crate::ids::RequestId;

/// The request type adapted handlers receive.
pub type CompatRequest = http::Request<Body>;

/// Request body: an owned copy of the bytes, readable with [`io::Read`].
#[derive(Debug, Clone, Default)]
pub struct Body {
    inner: io::Cursor<Vec<u8>>,
}

impl Body {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            inner: io::Cursor::new(bytes),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Total body length, regardless of how much has been read.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.get_ref().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.get_ref().is_empty()
    }

    /// The whole body, regardless of the read position.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.get_ref()
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes().to_vec())
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// The request-URI exactly as received by the server.
///
/// `http::Uri` drops fragments and normalises some forms, so the raw string
/// travels separately as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUri(pub String);

/// Values set on the [`RequestContext`] before dispatch, plus the request id.
///
/// Carried as a request extension so handlers can read middleware-provided
/// data without access to the router's context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    request_id: Option<RequestId>,
    values: HashMap<String, Value>,
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every key of `ctx` into a new `Context`.
    #[must_use]
    pub fn from_request_context(ctx: &RequestContext) -> Self {
        let mut values = HashMap::with_capacity(ctx.key_count());
        ctx.for_each_key(|k, v| {
            values.insert(k.to_string(), v.clone());
        });
        Self {
            request_id: Some(ctx.request_id()),
            values,
        }
    }

    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    #[must_use]
    pub fn request_id(&self) -> Option<RequestId> {
        self.request_id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn parse_version(protocol: &str) -> Result<Version, ConversionError> {
    match protocol {
        "HTTP/0.9" => Ok(Version::HTTP_09),
        "HTTP/1.0" => Ok(Version::HTTP_10),
        "HTTP/1.1" => Ok(Version::HTTP_11),
        "HTTP/2" | "HTTP/2.0" => Ok(Version::HTTP_2),
        "HTTP/3" | "HTTP/3.0" => Ok(Version::HTTP_3),
        other => Err(ConversionError::UnsupportedVersion(other.to_string())),
    }
}

/// Build a handler-side request from the router's request.
///
/// Copies method, URI, protocol, headers (repeated names keep their order)
/// and body. `Host` is synthesised from an absolute-form URI and
/// `Content-Length` from a non-empty body when the client sent neither.
/// The [`RequestUri`] and [`Context`] extensions are always present on the
/// result.
///
/// # Errors
///
/// Returns a [`ConversionError`] when any field cannot be represented by the
/// `http` crate types.
pub fn compat_request(ctx: &RequestContext) -> Result<CompatRequest, ConversionError> {
    let src = &ctx.request;

    let method = Method::from_bytes(src.method().as_bytes())
        .map_err(|_| ConversionError::InvalidMethod(src.method().to_string()))?;
    let uri: Uri = src
        .request_uri()
        .parse()
        .map_err(|_| ConversionError::InvalidUri(src.request_uri().to_string()))?;
    let version = parse_version(src.protocol())?;

    let mut headers = HeaderMap::with_capacity(src.header_count() + 2);
    for (name, value) in src.headers() {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConversionError::InvalidHeaderName(name.to_string()))?;
        let header_value = HeaderValue::from_bytes(value.as_bytes())
            .map_err(|_| ConversionError::InvalidHeaderValue(name.to_string()))?;
        headers.append(header_name, header_value);
    }

    if !headers.contains_key(HOST) {
        if let Some(authority) = uri.authority() {
            let value = HeaderValue::from_str(authority.as_str())
                .map_err(|_| ConversionError::InvalidHeaderValue(HOST.to_string()))?;
            headers.insert(HOST, value);
        }
    }

    let body = src.body();
    if !body.is_empty() && !headers.contains_key(CONTENT_LENGTH) {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    }

    let mut request = http::Request::new(Body::new(body.to_vec()));
    *request.method_mut() = method;
    *request.uri_mut() = uri;
    *request.version_mut() = version;
    *request.headers_mut() = headers;

    let extensions = request.extensions_mut();
    extensions.insert(RequestUri(src.request_uri().to_string()));
    extensions.insert(Context::from_request_context(ctx));

    Ok(request)
}

fn parse_pairs(bytes: &[u8]) -> Vec<(String, String)> {
    url::form_urlencoded::parse(bytes)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Convenience accessors for adapted handlers.
pub trait CompatRequestExt {
    /// Raw request-URI as received; falls back to the parsed URI.
    fn request_uri(&self) -> &str;

    /// Context propagated from the router, if any.
    fn context(&self) -> Option<&Context>;

    fn context_value(&self, key: &str) -> Option<&Value>;

    /// `Host` header, falling back to the URI authority.
    fn host(&self) -> Option<&str>;

    /// Declared `Content-Length`, if present and numeric.
    fn content_length(&self) -> Option<u64>;

    /// Decoded query parameters in request order.
    fn query_pairs(&self) -> Vec<(String, String)>;

    /// First value of a query parameter.
    fn query_value(&self, key: &str) -> Option<String>;

    fn cookies(&self) -> Vec<Cookie>;

    fn cookie(&self, name: &str) -> Option<Cookie>;

    /// Form values: urlencoded body fields first (POST, PUT and PATCH), then
    /// query parameters.
    fn parse_form(&self) -> Vec<(String, String)>;

    /// First form value for `key`, see [`CompatRequestExt::parse_form`].
    fn form_value(&self, key: &str) -> Option<String> {
        self.parse_form()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

impl CompatRequestExt for CompatRequest {
    fn request_uri(&self) -> &str {
        match self.extensions().get::<RequestUri>() {
            Some(raw) => raw.0.as_str(),
            None => self
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/"),
        }
    }

    fn context(&self) -> Option<&Context> {
        self.extensions().get::<Context>()
    }

    fn context_value(&self, key: &str) -> Option<&Value> {
        self.context().and_then(|c| c.value(key))
    }

    fn host(&self) -> Option<&str> {
        self.headers()
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| self.uri().authority().map(|a| a.as_str()))
    }

    fn content_length(&self) -> Option<u64> {
        self.headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }

    fn query_pairs(&self) -> Vec<(String, String)> {
        parse_pairs(self.uri().query().unwrap_or("").as_bytes())
    }

    fn query_value(&self, key: &str) -> Option<String> {
        url::form_urlencoded::parse(self.uri().query().unwrap_or("").as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    fn cookies(&self) -> Vec<Cookie> {
        read_cookies(self.headers())
    }

    fn cookie(&self, name: &str) -> Option<Cookie> {
        self.cookies().into_iter().find(|c| c.name == name)
    }

    fn parse_form(&self) -> Vec<(String, String)> {
        let mut form = Vec::new();
        let has_body = matches!(*self.method(), Method::POST | Method::PUT | Method::PATCH);
        let urlencoded = self
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| {
                ct.split(';')
                    .next()
                    .unwrap_or("")
                    .trim()
                    .eq_ignore_ascii_case("application/x-www-form-urlencoded")
            })
            .unwrap_or(false);
        if has_body && urlencoded {
            form.extend(parse_pairs(self.body().as_bytes()));
        }
        form.extend(self.query_pairs());
        form
    }
}
