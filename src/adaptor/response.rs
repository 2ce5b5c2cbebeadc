//! Handler-side response writer.

use std::io;

use http::header::{CONTENT_LENGTH, SET_COOKIE};
use http::{HeaderMap, StatusCode};
use tracing::debug;

use crate::context::Response;

/// The response interface adapted handlers write to.
///
/// Mirrors the classic writer contract: headers may be changed through
/// [`ResponseWriter::header`] until the status line is committed, either by
/// [`ResponseWriter::write_header`] or by the first body write (implicit
/// `200 OK`). Changes made after that are ignored.
pub trait ResponseWriter: io::Write {
    /// Headers that will be sent with the response.
    fn header(&mut self) -> &mut HeaderMap;

    /// Commit the status line and headers. Only the first call has an effect.
    fn write_header(&mut self, status: StatusCode);
}

/// [`ResponseWriter`] backed by the router's response buffers.
///
/// Body bytes go straight into [`Response::body_mut`]; only headers are
/// staged, so that the commit-on-first-write rule holds.
pub struct CompatResponseWriter<'a> {
    response: &'a mut Response,
    staged: HeaderMap,
    status: Option<StatusCode>,
}

impl<'a> CompatResponseWriter<'a> {
    #[must_use]
    pub fn new(response: &'a mut Response) -> Self {
        Self {
            response,
            staged: HeaderMap::new(),
            status: None,
        }
    }

    /// Status committed so far, if any.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Commit with `200 OK` if the handler never wrote anything.
    pub fn finish(mut self) {
        if self.status.is_none() {
            self.write_header(StatusCode::OK);
        }
    }

    /// Copy staged headers into the response. A staged name replaces any
    /// value already on the response, except `Set-Cookie` which accumulates.
    fn commit(&mut self) {
        let staged = std::mem::take(&mut self.staged);
        for name in staged.keys() {
            // the server frames the body itself
            if name == CONTENT_LENGTH {
                continue;
            }
            let canonical = canonical_header_key(name.as_str());
            if name != SET_COOKIE {
                self.response.del_header(&canonical);
            }
            for value in staged.get_all(name) {
                let value = String::from_utf8_lossy(value.as_bytes());
                self.response.add_header(&canonical, &value);
            }
        }
    }
}

/// `x-go-pprof` -> `X-Go-Pprof`. `HeaderMap` stores names lowercased.
#[must_use]
pub fn canonical_header_key(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() };
            upper = c == '-';
            out
        })
        .collect()
}

impl ResponseWriter for CompatResponseWriter<'_> {
    fn header(&mut self) -> &mut HeaderMap {
        &mut self.staged
    }

    fn write_header(&mut self, status: StatusCode) {
        if let Some(existing) = self.status {
            debug!(
                existing = existing.as_u16(),
                ignored = status.as_u16(),
                "Superfluous write_header call"
            );
            return;
        }
        self.status = Some(status);
        self.response.set_status_code(status.as_u16());
        self.commit();
    }
}

impl io::Write for CompatResponseWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.write_header(StatusCode::OK);
        }
        self.response.append_body(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
