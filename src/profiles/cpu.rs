//! CPU sampling through `pprof-rs`.
//!
//! The profiler is process-wide: while one request is sampling, any other
//! attempt to start it fails and the caller answers with a 500.

use pprof::{ProfilerGuardBuilder, Report};
use std::collections::BTreeMap;
use std::io;
use std::time::Duration;
use tracing::{debug, info};

use super::proto;

/// Sampling rate for `/profile` and `/trace`.
pub const CPU_FREQUENCY_HZ: i32 = 100;

/// Sampling rate for fgprof; off by one from 100 so samples do not
/// lock-step with periodic work.
pub const FGPROF_FREQUENCY_HZ: i32 = 99;

const BLOCKLIST: &[&str] = &["libc", "libgcc", "pthread", "vdso"];

/// Sample every thread of the process for `duration`.
///
/// The sleep goes through `may`, so a request coroutine yields its worker
/// thread while the profile is collected.
///
/// # Errors
///
/// Fails when the profiler is already running or the report cannot be built.
pub fn sample(duration: Duration, frequency: i32) -> Result<Report, pprof::Error> {
    let guard = ProfilerGuardBuilder::default()
        .frequency(frequency)
        .blocklist(BLOCKLIST)
        .build()?;
    info!(
        duration_ms = duration.as_millis() as u64,
        frequency_hz = frequency,
        "CPU sampling started"
    );
    may::coroutine::sleep(duration);
    let report = guard.report().build()?;
    debug!(stacks = report.data.len(), "CPU sampling finished");
    Ok(report)
}

/// Report as a gzipped pprof protobuf.
///
/// # Errors
///
/// Fails if the report cannot be converted or compressed.
pub fn to_pprof(report: &Report) -> io::Result<Vec<u8>> {
    let profile = report.pprof().map_err(io::Error::other)?;
    proto::encode_gzipped(&profile)
}

/// Report as folded stacks: `thread;root;...;leaf count`, one per line,
/// sorted by stack.
#[must_use]
pub fn to_folded(report: &Report) -> String {
    let mut stacks: BTreeMap<String, isize> = BTreeMap::new();
    for (frames, count) in &report.data {
        let mut line = if frames.thread_name.is_empty() {
            format!("thread-{}", frames.thread_id)
        } else {
            frames.thread_name.clone()
        };
        // frames are stored leaf first
        for frame in frames.frames.iter().rev() {
            for symbol in frame.iter().rev() {
                line.push(';');
                line.push_str(&symbol.name());
            }
        }
        *stacks.entry(line).or_default() += *count;
    }

    stacks
        .into_iter()
        .map(|(stack, count)| format!("{stack} {count}\n"))
        .collect()
}
