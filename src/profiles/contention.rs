//! `block` and `mutex` profiles.
//!
//! Rust's standard locks keep no contention records, so both profiles are
//! well-formed but carry no samples.

use std::io;

use super::proto::{self, ProfileBuilder};

/// Cycles per second reported in the text header; delays are in nanoseconds.
pub const CYCLES_PER_SECOND: u64 = 1_000_000_000;

/// Text form. The mutex profile adds its sampling period.
#[must_use]
pub fn contention_text(mutex: bool) -> String {
    let mut out = format!("--- contention:\ncycles/second={CYCLES_PER_SECOND}\n");
    if mutex {
        out.push_str("sampling period=1\n");
    }
    out
}

/// Empty profile with the standard contention sample types.
///
/// # Errors
///
/// Fails if encoding or compression fails.
pub fn contention_pprof() -> io::Result<Vec<u8>> {
    let builder = ProfileBuilder::new(&[("contentions", "count"), ("delay", "nanoseconds")])
        .period("contentions", "count", 1);
    proto::encode_gzipped(&builder.build())
}
