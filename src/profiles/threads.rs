//! OS thread listings for the `goroutine` and `threadcreate` profiles.
//!
//! Coroutines are not visible from outside `may`, so both profiles report
//! the OS threads backing the process. Linux reads `/proc/self/task`;
//! elsewhere only the calling thread is known.

use std::io;

use super::proto::{self, ProfileBuilder};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadInfo {
    pub tid: u64,
    pub name: String,
    /// Single-letter scheduler state (`R`, `S`, `D`...) or `?`
    pub state: String,
}

/// Every thread of the process, ordered by id.
#[must_use]
pub fn list_threads() -> Vec<ThreadInfo> {
    let mut threads = platform_threads();
    if threads.is_empty() {
        threads.push(current_thread());
    }
    threads.sort_by_key(|t| t.tid);
    threads
}

#[cfg(target_os = "linux")]
fn platform_threads() -> Vec<ThreadInfo> {
    let Ok(entries) = std::fs::read_dir("/proc/self/task") else {
        return Vec::new();
    };
    entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let tid: u64 = entry.file_name().to_str()?.parse().ok()?;
            let name = std::fs::read_to_string(entry.path().join("comm"))
                .map(|s| s.trim_end().to_string())
                .unwrap_or_default();
            let state = std::fs::read_to_string(entry.path().join("stat"))
                .ok()
                .and_then(|stat| parse_stat_state(&stat))
                .unwrap_or_else(|| "?".to_string());
            Some(ThreadInfo { tid, name, state })
        })
        .collect()
}

#[cfg(not(target_os = "linux"))]
fn platform_threads() -> Vec<ThreadInfo> {
    Vec::new()
}

/// State field of `/proc/<pid>/task/<tid>/stat`. The comm field may
/// contain spaces and parentheses, so parse from the last `)`.
fn parse_stat_state(stat: &str) -> Option<String> {
    let rest = &stat[stat.rfind(')')? + 1..];
    rest.split_whitespace().next().map(str::to_string)
}

fn current_thread() -> ThreadInfo {
    let current = std::thread::current();
    ThreadInfo {
        tid: 0,
        name: current.name().unwrap_or("unnamed").to_string(),
        state: "R".to_string(),
    }
}

/// Thread count as reported by the kernel, falling back to the listing.
#[must_use]
pub fn thread_count() -> usize {
    #[cfg(target_os = "linux")]
    {
        let from_status = std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|status| {
                status
                    .lines()
                    .find_map(|l| l.strip_prefix("Threads:"))
                    .and_then(|v| v.trim().parse().ok())
            });
        if let Some(count) = from_status {
            return count;
        }
    }
    list_threads().len()
}

/// `goroutine` text output. `debug=1` groups one line per thread,
/// `debug>=2` adds the stack of the thread serving the request.
#[must_use]
pub fn goroutine_text(threads: &[ThreadInfo], debug: i64) -> String {
    let mut out = format!("goroutine profile: total {}\n", threads.len());
    for t in threads {
        out.push_str(&format!("1 @ {}\n#\t{} [{}]\n\n", t.tid, t.name, t.state));
    }
    if debug >= 2 {
        let current = std::thread::current();
        out.push_str(&format!(
            "thread {} [running]:\n{:?}\n",
            current.name().unwrap_or("unnamed"),
            backtrace::Backtrace::new()
        ));
    }
    out
}

/// `goroutine` protobuf: one sample per thread.
///
/// # Errors
///
/// Fails if encoding or compression fails.
pub fn goroutine_pprof(threads: &[ThreadInfo]) -> io::Result<Vec<u8>> {
    let mut builder = ProfileBuilder::new(&[("goroutine", "count")]).period("goroutine", "count", 1);
    for t in threads {
        let tid = t.tid.to_string();
        builder.sample(
            vec![1],
            &[
                ("thread_id", tid.as_str()),
                ("thread_name", t.name.as_str()),
                ("state", t.state.as_str()),
            ],
        );
    }
    proto::encode_gzipped(&builder.build())
}

#[must_use]
pub fn threadcreate_text(count: usize) -> String {
    format!("threadcreate profile: total {count}\n")
}

/// `threadcreate` protobuf: a single sample carrying the thread count.
///
/// # Errors
///
/// Fails if encoding or compression fails.
pub fn threadcreate_pprof(count: usize) -> io::Result<Vec<u8>> {
    let mut builder =
        ProfileBuilder::new(&[("threadcreate", "count")]).period("threadcreate", "count", 1);
    builder.sample(vec![count as i64], &[]);
    proto::encode_gzipped(&builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stat_state() {
        assert_eq!(
            parse_stat_state("1234 (may worker) 1) S 1 2 3"),
            Some("S".to_string())
        );
        assert_eq!(parse_stat_state("garbage"), None);
    }

    #[test]
    fn test_listing_is_never_empty() {
        let threads = list_threads();
        assert!(!threads.is_empty());
        assert!(thread_count() >= 1);
    }

    #[test]
    fn test_goroutine_text() {
        let threads = vec![ThreadInfo {
            tid: 7,
            name: "worker".into(),
            state: "S".into(),
        }];
        let text = goroutine_text(&threads, 1);
        assert!(text.starts_with("goroutine profile: total 1\n"));
        assert!(text.contains("1 @ 7\n#\tworker [S]"));
        assert!(goroutine_text(&threads, 2).contains("[running]:"));
    }

    #[test]
    fn test_threadcreate_text() {
        assert_eq!(threadcreate_text(3), "threadcreate profile: total 3\n");
    }
}
