use http::StatusCode;
use may_minihttp::Response;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::error;

use crate::context::RequestContext;

/// Upper bound on distinct `Name: value` lines kept for reuse.
pub const MAX_INTERNED_HEADER_LINES: usize = 4096;

/// Leaked `Name: value` lines, reused across responses.
///
/// may_minihttp only accepts `&'static str` header lines. Each distinct line
/// is leaked once; once `cap` lines are held nothing more is leaked.
struct HeaderLines {
    lines: HashSet<&'static str>,
    cap: usize,
}

impl HeaderLines {
    fn new(cap: usize) -> Self {
        Self {
            lines: HashSet::new(),
            cap,
        }
    }

    /// `None` when `line` is new and the set is full.
    fn intern(&mut self, line: String) -> Option<&'static str> {
        if let Some(existing) = self.lines.get(line.as_str()) {
            return Some(existing);
        }
        if self.lines.len() >= self.cap {
            return None;
        }
        let leaked: &'static str = Box::leak(line.into_boxed_str());
        self.lines.insert(leaked);
        Some(leaked)
    }

    fn len(&self) -> usize {
        self.lines.len()
    }
}

static HEADER_LINES: Lazy<Mutex<HeaderLines>> =
    Lazy::new(|| Mutex::new(HeaderLines::new(MAX_INTERNED_HEADER_LINES)));

fn intern_header_line(line: String) -> Option<&'static str> {
    let mut lines = match HEADER_LINES.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    lines.intern(line)
}

/// Reason phrase for `status`, or `Unknown` for unregistered codes.
#[must_use]
pub fn status_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

/// Copy the context's response onto the wire response.
///
/// `Content-Length` is left to may_minihttp, which frames the body itself.
/// Once [`MAX_INTERNED_HEADER_LINES`] distinct lines have been seen, headers
/// with a line not seen before are dropped and logged.
pub fn write_response(ctx: &RequestContext, res: &mut Response) {
    let status = ctx.response.status_code();
    res.status_code(status as usize, status_reason(status));
    for (name, value) in ctx.response.headers() {
        if name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        match intern_header_line(format!("{name}: {value}")) {
            Some(line) => {
                res.header(line);
            }
            None => error!(
                request_id = %ctx.request_id(),
                header = %name,
                limit = MAX_INTERNED_HEADER_LINES,
                "Header line cache full, dropping response header"
            ),
        }
    }
    res.body_vec(ctx.response.body().to_vec());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(403), "Forbidden");
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(599), "Unknown");
    }

    #[test]
    fn test_header_lines_are_reused() {
        let a = intern_header_line("X-Go-Pprof: 1".to_string());
        let b = intern_header_line("X-Go-Pprof: 1".to_string());
        if let (Some(a), Some(b)) = (a, b) {
            assert!(std::ptr::eq(a, b));
        }
    }

    #[test]
    fn test_header_lines_stay_bounded() {
        let mut lines = HeaderLines::new(4);
        for i in 0..4 {
            assert!(lines.intern(format!("Set-Cookie: session={i}")).is_some());
        }
        for i in 4..100 {
            assert_eq!(lines.intern(format!("Set-Cookie: session={i}")), None);
        }
        assert_eq!(lines.len(), 4);
        // lines seen before the cap keep being served
        assert_eq!(
            lines.intern("Set-Cookie: session=2".to_string()),
            Some("Set-Cookie: session=2")
        );
        assert_eq!(lines.len(), 4);
    }
}
