use super::HeaderVec;
use smallvec::SmallVec;

/// Server-side view of an incoming HTTP request.
///
/// Fields are kept close to the wire: the request-URI is stored exactly as it
/// was received (absolute-form, fragments and all) and headers keep their
/// original case and order. Buffers are reused between requests through
/// [`Request::reset`], so nothing borrowed from a `Request` may outlive the
/// request it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: String,
    request_uri: String,
    protocol: String,
    headers: HeaderVec,
    body: Vec<u8>,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            request_uri: "/".to_string(),
            protocol: "HTTP/1.1".to_string(),
            headers: SmallVec::new(),
            body: Vec::new(),
        }
    }
}

impl Request {
    /// Create an empty `GET / HTTP/1.1` request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every buffer while keeping allocated capacity.
    pub fn reset(&mut self) {
        self.method.clear();
        self.method.push_str("GET");
        self.request_uri.clear();
        self.request_uri.push('/');
        self.protocol.clear();
        self.protocol.push_str("HTTP/1.1");
        self.headers.clear();
        self.body.clear();
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn set_method(&mut self, method: &str) {
        self.method.clear();
        self.method.push_str(method);
    }

    /// The request-URI exactly as it appeared on the request line.
    #[must_use]
    pub fn request_uri(&self) -> &str {
        &self.request_uri
    }

    pub fn set_request_uri(&mut self, uri: &str) {
        self.request_uri.clear();
        self.request_uri.push_str(uri);
    }

    #[must_use]
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn set_protocol(&mut self, protocol: &str) {
        self.protocol.clear();
        self.protocol.push_str(protocol);
    }

    /// Path component of the request-URI, without query or fragment.
    ///
    /// Absolute-form URIs (`http://host/path?q`) have their scheme and
    /// authority stripped. An empty path is reported as `/`.
    #[must_use]
    pub fn path(&self) -> &str {
        let uri = strip_fragment(&self.request_uri);
        let uri = match uri.find("://") {
            Some(pos) => {
                let rest = &uri[pos + 3..];
                match rest.find(['/', '?']) {
                    Some(slash) => &rest[slash..],
                    None => "",
                }
            }
            None => uri,
        };
        let path = uri.split('?').next().unwrap_or("");
        if path.is_empty() {
            "/"
        } else {
            path
        }
    }

    /// Raw query string (without the leading `?`), empty when absent.
    #[must_use]
    pub fn query_string(&self) -> &str {
        let uri = strip_fragment(&self.request_uri);
        uri.split_once('?').map(|(_, q)| q).unwrap_or("")
    }

    /// Decoded query parameters in request order.
    #[must_use]
    pub fn query_args(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(self.query_string().as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Host from the `Host` header, falling back to an absolute-form URI.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        if let Some(host) = self.header("host") {
            return Some(host);
        }
        let uri = &self.request_uri;
        let pos = uri.find("://")?;
        let rest = &uri[pos + 3..];
        let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let authority = &rest[..end];
        let authority = authority.rsplit('@').next().unwrap_or(authority);
        (!authority.is_empty()).then_some(authority)
    }

    pub fn set_host(&mut self, host: &str) {
        self.set_header("Host", host);
    }

    /// First value of a header (case-insensitive per RFC 7230).
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a header, in the order received.
    #[must_use]
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// All headers in wire order.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    /// Replace every value of `name` with `value`.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    /// Append a value, keeping any existing ones.
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    pub fn del_header(&mut self, name: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    /// Add a cookie to the `Cookie` header.
    pub fn set_cookie(&mut self, name: &str, value: &str) {
        let pair = format!("{name}={value}");
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case("cookie"))
        {
            Some((_, existing)) => {
                existing.push_str("; ");
                existing.push_str(&pair);
            }
            None => self.headers.push(("Cookie".to_string(), pair)),
        }
    }

    /// Cookie value by name, taken from every `Cookie` header.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.header_values("cookie")
            .into_iter()
            .flat_map(|h| h.split(';'))
            .filter_map(|pair| {
                let (k, v) = pair.trim().split_once('=')?;
                Some((k.trim(), v.trim()))
            })
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn set_content_type(&mut self, content_type: &str) {
        self.set_header("Content-Type", content_type);
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Mutable access to the body buffer (used for copy-in from the wire).
    pub fn body_mut(&mut self) -> &mut Vec<u8> {
        &mut self.body
    }

    pub fn set_body(&mut self, body: &[u8]) {
        self.body.clear();
        self.body.extend_from_slice(body);
    }

    /// Encode `form` as `application/x-www-form-urlencoded` into the body.
    pub fn set_form_data<'a, I>(&mut self, form: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form)
            .finish();
        self.set_content_type("application/x-www-form-urlencoded");
        self.set_body(encoded.as_bytes());
    }
}

fn strip_fragment(uri: &str) -> &str {
    uri.split('#').next().unwrap_or(uri)
}
