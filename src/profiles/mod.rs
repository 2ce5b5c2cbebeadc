//! # Profiles
//!
//! Ready-made handlers, written against the `http` request model, that serve
//! pprof-compatible profiles of the running process. They are mounted by
//! [`crate::pprof::register`] and [`crate::fgprof::fgprof_register`] but can
//! be wrapped with [`crate::adaptor::adapt`] and bound anywhere.
//!
//! | Handler | Output |
//! |---------|--------|
//! | [`index`] | HTML listing of every profile |
//! | [`cmdline`] | process arguments, NUL separated |
//! | [`profile`] | CPU profile (`seconds`, default 30), gzipped protobuf |
//! | [`trace`] | CPU samples as folded stacks (`seconds`, default 1) |
//! | [`symbol`] | address to function name lookup |
//! | [`handler`] | named profile: `allocs`, `block`, `goroutine`, `heap`, `mutex`, `threadcreate` |
//! | [`fgprof`] | full-stack sampling, pprof or folded |
//!
//! Named profiles answer `debug=0` (default) with a gzipped protobuf and
//! `debug>0` with plain text.
//!
//! CPU sampling is process-wide; concurrent CPU profile requests fail with
//! a 500 until the running one finishes.

pub mod contention;
pub mod cpu;
pub mod memory;
mod proto;
pub mod symbol;
pub mod threads;

use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use http::{HeaderValue, Method, StatusCode};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, warn};

use crate::adaptor::{CompatRequest, CompatRequestExt, HttpHandler, ResponseWriter};
use crate::runtime_config::RuntimeConfig;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";
const NOSNIFF: &str = "X-Content-Type-Options";

/// Default `seconds` for [`profile`] and [`fgprof`].
pub const DEFAULT_PROFILE_SECONDS: u64 = 30;
/// Default `seconds` for [`trace`].
pub const DEFAULT_TRACE_SECONDS: f64 = 1.0;

/// Profiles served by [`handler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    Allocs,
    Block,
    Goroutine,
    Heap,
    Mutex,
    ThreadCreate,
}

impl ProfileKind {
    /// Every named profile, in index order.
    pub const ALL: [ProfileKind; 6] = [
        ProfileKind::Allocs,
        ProfileKind::Block,
        ProfileKind::Goroutine,
        ProfileKind::Heap,
        ProfileKind::Mutex,
        ProfileKind::ThreadCreate,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ProfileKind::Allocs => "allocs",
            ProfileKind::Block => "block",
            ProfileKind::Goroutine => "goroutine",
            ProfileKind::Heap => "heap",
            ProfileKind::Mutex => "mutex",
            ProfileKind::ThreadCreate => "threadcreate",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            ProfileKind::Allocs => "Allocator totals for the process, including memory already freed back to the allocator.",
            ProfileKind::Block => "Time spent blocked on synchronization primitives. Standard library locks keep no records, so this profile is empty.",
            ProfileKind::Goroutine => "The OS threads of the process with their scheduler state. Use debug=2 for the stack of the serving thread.",
            ProfileKind::Heap => "Memory in use by the process. Pass gc=1 to refresh allocator statistics first.",
            ProfileKind::Mutex => "Holders of contended mutexes. Standard library locks keep no records, so this profile is empty.",
            ProfileKind::ThreadCreate => "Number of OS threads created by the process.",
        }
    }

    fn disposition(self) -> &'static str {
        match self {
            ProfileKind::Allocs => "attachment; filename=\"allocs\"",
            ProfileKind::Block => "attachment; filename=\"block\"",
            ProfileKind::Goroutine => "attachment; filename=\"goroutine\"",
            ProfileKind::Heap => "attachment; filename=\"heap\"",
            ProfileKind::Mutex => "attachment; filename=\"mutex\"",
            ProfileKind::ThreadCreate => "attachment; filename=\"threadcreate\"",
        }
    }

    /// Number of records the profile currently holds.
    #[must_use]
    pub fn count(self) -> usize {
        match self {
            ProfileKind::Allocs | ProfileKind::Heap => memory::MemorySnapshot::capture().fields.len(),
            ProfileKind::Block | ProfileKind::Mutex => 0,
            ProfileKind::Goroutine => threads::list_threads().len(),
            ProfileKind::ThreadCreate => threads::thread_count(),
        }
    }

    fn render_text(self, debug: i64) -> String {
        match self {
            ProfileKind::Allocs => memory::MemorySnapshot::capture().to_text("allocs"),
            ProfileKind::Heap => memory::MemorySnapshot::capture().to_text("heap"),
            ProfileKind::Block => contention::contention_text(false),
            ProfileKind::Mutex => contention::contention_text(true),
            ProfileKind::Goroutine => threads::goroutine_text(&threads::list_threads(), debug),
            ProfileKind::ThreadCreate => threads::threadcreate_text(threads::thread_count()),
        }
    }

    fn render_pprof(self) -> std::io::Result<Vec<u8>> {
        match self {
            ProfileKind::Allocs => memory::MemorySnapshot::capture().to_pprof("alloc_space"),
            ProfileKind::Heap => memory::MemorySnapshot::capture().to_pprof("inuse_space"),
            ProfileKind::Block | ProfileKind::Mutex => contention::contention_pprof(),
            ProfileKind::Goroutine => threads::goroutine_pprof(&threads::list_threads()),
            ProfileKind::ThreadCreate => threads::threadcreate_pprof(threads::thread_count()),
        }
    }
}

fn write_body(w: &mut dyn ResponseWriter, body: &[u8]) {
    if let Err(err) = w.write_all(body) {
        debug!(error = %err, "Failed to write profile body");
    }
}

/// Error response for profile endpoints: plain text, `X-Go-Pprof: 1`, and
/// no attachment disposition.
pub fn serve_error(w: &mut dyn ResponseWriter, status: StatusCode, text: &str) {
    let headers = w.header();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    headers.insert("X-Go-Pprof", HeaderValue::from_static("1"));
    headers.remove(CONTENT_DISPOSITION);
    w.write_header(status);
    write_body(w, format!("{text}\n").as_bytes());
}

fn exceeds_write_timeout(duration: Duration) -> bool {
    RuntimeConfig::global()
        .write_timeout
        .is_some_and(|limit| duration >= limit)
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// HTML index of every profile under the request's path.
pub fn index(w: &mut dyn ResponseWriter, req: CompatRequest) {
    let path = html_escape(req.uri().path());

    let mut rows = String::new();
    let mut descriptions = String::new();
    for kind in ProfileKind::ALL {
        let name = kind.name();
        rows.push_str(&format!(
            "<tr><td>{}</td><td><a href='{name}?debug=1'>{name}</a></td></tr>\n",
            kind.count()
        ));
        descriptions.push_str(&format!(
            "<li><div class=profile-name>{name}: </div> {}</li>\n",
            kind.description()
        ));
    }
    let extras = [
        ("cmdline", "The command line of the running program."),
        ("profile", "CPU profile. Duration is set with the seconds parameter."),
        ("symbol", "Maps program counters, separated by +, to function names."),
        ("trace", "CPU samples as folded stacks. Duration is set with the seconds parameter."),
    ];
    for (name, description) in extras {
        rows.push_str(&format!(
            "<tr><td></td><td><a href='{name}'>{name}</a></td></tr>\n"
        ));
        descriptions.push_str(&format!(
            "<li><div class=profile-name>{name}: </div> {description}</li>\n"
        ));
    }

    let page = format!(
        "<html>\n<head>\n<title>{path}</title>\n<style>\n\
         .profile-name {{ display:inline-block; width:6rem; }}\n\
         </style>\n</head>\n<body>\n{path}\n<br>\n\
         <p>Set debug=1 as a query parameter to export in legacy text format</p>\n\
         <br>\nTypes of profiles available:\n<table>\n\
         <thead><td>Count</td><td>Profile</td></thead>\n{rows}</table>\n\
         <a href='goroutine?debug=2'>full thread dump</a>\n<br>\n\
         <p>\nProfile Descriptions:\n<ul>\n{descriptions}</ul>\n</p>\n</body>\n</html>\n"
    );
    write_body(w, page.as_bytes());
}

/// Command line of the running process, arguments separated by NUL.
pub fn cmdline(w: &mut dyn ResponseWriter, _req: CompatRequest) {
    let headers = w.header();
    headers.insert(NOSNIFF, HeaderValue::from_static("nosniff"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    let args: Vec<String> = std::env::args_os()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    write_body(w, args.join("\0").as_bytes());
}

/// CPU profile for `seconds` (default 30) as a gzipped protobuf.
pub fn profile(w: &mut dyn ResponseWriter, req: CompatRequest) {
    w.header()
        .insert(NOSNIFF, HeaderValue::from_static("nosniff"));
    let seconds = req
        .form_value("seconds")
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|s| *s > 0)
        .map_or(DEFAULT_PROFILE_SECONDS, |s| s as u64);
    let duration = Duration::from_secs(seconds);
    if exceeds_write_timeout(duration) {
        serve_error(
            w,
            StatusCode::BAD_REQUEST,
            "profile duration exceeds server's WriteTimeout",
        );
        return;
    }

    let encoded = cpu::sample(duration, cpu::CPU_FREQUENCY_HZ)
        .map_err(|e| e.to_string())
        .and_then(|report| cpu::to_pprof(&report).map_err(|e| e.to_string()));
    match encoded {
        Ok(bytes) => {
            let headers = w.header();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM));
            headers.insert(
                CONTENT_DISPOSITION,
                HeaderValue::from_static("attachment; filename=\"profile\""),
            );
            write_body(w, &bytes);
        }
        Err(err) => {
            warn!(error = %err, "CPU profile failed");
            serve_error(
                w,
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Could not enable CPU profiling: {err}"),
            );
        }
    }
}

/// CPU samples for `seconds` (default 1, fractional allowed) as folded
/// stacks. Values that are not positive or overflow a [`Duration`] fall back
/// to the default.
pub fn trace(w: &mut dyn ResponseWriter, req: CompatRequest) {
    w.header()
        .insert(NOSNIFF, HeaderValue::from_static("nosniff"));
    let duration = req
        .form_value("seconds")
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|s| *s > 0.0)
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
        .unwrap_or(Duration::from_secs_f64(DEFAULT_TRACE_SECONDS));
    if exceeds_write_timeout(duration) {
        serve_error(
            w,
            StatusCode::BAD_REQUEST,
            "profile duration exceeds server's WriteTimeout",
        );
        return;
    }

    match cpu::sample(duration, cpu::CPU_FREQUENCY_HZ) {
        Ok(report) => {
            let headers = w.header();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM));
            headers.insert(
                CONTENT_DISPOSITION,
                HeaderValue::from_static("attachment; filename=\"trace\""),
            );
            write_body(w, cpu::to_folded(&report).as_bytes());
        }
        Err(err) => {
            warn!(error = %err, "Trace failed");
            serve_error(
                w,
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Could not enable tracing: {err}"),
            );
        }
    }
}

/// Resolve program counters to function names.
///
/// Addresses come from the body of a POST, or the raw query of a GET,
/// separated by `+`.
pub fn symbol(w: &mut dyn ResponseWriter, req: CompatRequest) {
    let headers = w.header();
    headers.insert(NOSNIFF, HeaderValue::from_static("nosniff"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));

    let input = if *req.method() == Method::POST {
        String::from_utf8_lossy(req.body().as_bytes()).into_owned()
    } else {
        req.uri().query().unwrap_or_default().to_string()
    };
    write_body(w, symbol::lookup(&input).as_bytes());
}

/// Handler for one named profile, see [`handler`].
#[derive(Debug, Clone)]
pub struct NamedProfile {
    name: String,
}

impl NamedProfile {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Handler serving the profile called `name`.
///
/// Unknown names are answered with 404 `Unknown profile` at request time.
#[must_use]
pub fn handler(name: &str) -> NamedProfile {
    NamedProfile {
        name: name.to_string(),
    }
}

impl HttpHandler for NamedProfile {
    fn serve_http(&self, w: &mut dyn ResponseWriter, req: CompatRequest) {
        w.header()
            .insert(NOSNIFF, HeaderValue::from_static("nosniff"));
        let Some(kind) = ProfileKind::from_name(&self.name) else {
            serve_error(w, StatusCode::NOT_FOUND, "Unknown profile");
            return;
        };
        if req.form_value("seconds").is_some_and(|s| !s.is_empty()) {
            serve_error(
                w,
                StatusCode::BAD_REQUEST,
                "delta profiles are not supported",
            );
            return;
        }
        let gc = req
            .form_value("gc")
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(0);
        if kind == ProfileKind::Heap && gc > 0 {
            memory::collect_garbage();
        }
        let debug = req
            .form_value("debug")
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(0);

        if debug != 0 {
            w.header()
                .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
            write_body(w, kind.render_text(debug).as_bytes());
            return;
        }
        match kind.render_pprof() {
            Ok(bytes) => {
                let headers = w.header();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM));
                headers.insert(
                    CONTENT_DISPOSITION,
                    HeaderValue::from_static(kind.disposition()),
                );
                write_body(w, &bytes);
            }
            Err(err) => {
                warn!(profile = kind.name(), error = %err, "Profile encoding failed");
                serve_error(
                    w,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &format!("Could not write {} profile: {err}", kind.name()),
                );
            }
        }
    }
}

/// Output of [`fgprof`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FgprofFormat {
    Pprof,
    Folded,
}

impl FgprofFormat {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "" | "pprof" => Some(FgprofFormat::Pprof),
            "folded" => Some(FgprofFormat::Folded),
            _ => None,
        }
    }
}

/// Full-stack sampling for `seconds` (default 30).
///
/// Samples come from the same 99 Hz CPU-time (`SIGPROF`) sampler as
/// [`profile`]: threads blocked off-CPU are not sampled, so the result is
/// on-CPU time only, not wall-clock time. A `seconds` value that is not a
/// positive number or does not fit a [`Duration`] is answered with 400.
///
/// `format=pprof` (default) writes a gzipped protobuf with no content type
/// so it is sniffed as `application/x-gzip`; `format=folded` writes folded
/// stacks.
pub fn fgprof(w: &mut dyn ResponseWriter, req: CompatRequest) {
    let duration = match req.query_value("seconds") {
        None => Duration::from_secs(DEFAULT_PROFILE_SECONDS),
        Some(raw) => match raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|s| *s > 0.0)
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
        {
            Some(duration) => duration,
            None => {
                serve_error(w, StatusCode::BAD_REQUEST, &format!("bad seconds: {raw}"));
                return;
            }
        },
    };
    let raw_format = req.query_value("format").unwrap_or_default();
    let Some(format) = FgprofFormat::parse(&raw_format) else {
        serve_error(
            w,
            StatusCode::BAD_REQUEST,
            &format!("unknown format: {raw_format}"),
        );
        return;
    };
    if exceeds_write_timeout(duration) {
        serve_error(
            w,
            StatusCode::BAD_REQUEST,
            "profile duration exceeds server's WriteTimeout",
        );
        return;
    }

    let report = match cpu::sample(duration, cpu::FGPROF_FREQUENCY_HZ) {
        Ok(report) => report,
        Err(err) => {
            warn!(error = %err, "fgprof sampling failed");
            serve_error(
                w,
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Could not enable fgprof: {err}"),
            );
            return;
        }
    };
    match format {
        FgprofFormat::Folded => write_body(w, cpu::to_folded(&report).as_bytes()),
        FgprofFormat::Pprof => match cpu::to_pprof(&report) {
            Ok(bytes) => write_body(w, &bytes),
            Err(err) => serve_error(
                w,
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Could not write fgprof profile: {err}"),
            ),
        },
    }
}
