//! Cookie helpers for adapted handlers.
//!
//! Reading goes through every `Cookie` request header; writing appends one
//! `Set-Cookie` header per cookie to the writer's staged header map, which
//! the adapter copies to the router's response one value at a time.

use std::fmt;

use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};

use super::ResponseWriter;

/// `SameSite` attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

/// A request or response cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    /// Seconds; `Some(0)` or negative deletes the cookie.
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

impl Cookie {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }
}

impl fmt::Display for Cookie {
    /// Serialise as a `Set-Cookie` header value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, quote_if_needed(&self.value))?;
        if let Some(path) = &self.path {
            write!(f, "; Path={path}")?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={}", domain.trim_start_matches('.'))?;
        }
        match self.max_age {
            Some(age) if age > 0 => write!(f, "; Max-Age={age}")?,
            Some(_) => f.write_str("; Max-Age=0")?,
            None => {}
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        match self.same_site {
            Some(SameSite::Lax) => f.write_str("; SameSite=Lax")?,
            Some(SameSite::Strict) => f.write_str("; SameSite=Strict")?,
            Some(SameSite::None) => f.write_str("; SameSite=None")?,
            None => {}
        }
        Ok(())
    }
}

fn quote_if_needed(value: &str) -> String {
    if value.contains([' ', ',']) {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

fn is_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

/// Parse every cookie sent in the request's `Cookie` headers, in order.
///
/// Pairs with an invalid name are skipped; surrounding double quotes are
/// stripped from values.
#[must_use]
pub fn read_cookies(headers: &HeaderMap) -> Vec<Cookie> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|line| line.split(';'))
        .filter_map(|pair| {
            let pair = pair.trim();
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            let name = name.trim();
            if !is_token(name) {
                return None;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some(Cookie::new(name, value))
        })
        .collect()
}

/// Add a `Set-Cookie` header for `cookie` to the writer.
///
/// Cookies with an invalid name are dropped, matching the standard library
/// behaviour handlers expect.
pub fn set_cookie(w: &mut dyn ResponseWriter, cookie: &Cookie) {
    if !is_token(&cookie.name) {
        tracing::debug!(name = %cookie.name, "Dropping cookie with invalid name");
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
        w.header().append(SET_COOKIE, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_cookies_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1; b=\"two\""));
        headers.append(COOKIE, HeaderValue::from_static("c=3; bad name=x"));
        let cookies = read_cookies(&headers);
        let pairs: Vec<_> = cookies
            .iter()
            .map(|c| (c.name.as_str(), c.value.as_str()))
            .collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "two"), ("c", "3")]);
    }

    #[test]
    fn test_display_attributes() {
        let cookie = Cookie {
            domain: Some(".google.com".into()),
            path: Some("/".into()),
            max_age: Some(86400),
            secure: true,
            http_only: true,
            same_site: Some(SameSite::Lax),
            ..Cookie::new("myCookie2", "cookieValue2")
        };
        assert_eq!(
            cookie.to_string(),
            "myCookie2=cookieValue2; Path=/; Domain=google.com; Max-Age=86400; HttpOnly; Secure; SameSite=Lax"
        );
    }

    #[test]
    fn test_value_with_space_is_quoted() {
        assert_eq!(Cookie::new("k", "a b").to_string(), "k=\"a b\"");
    }
}
