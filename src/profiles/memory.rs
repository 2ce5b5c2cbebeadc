//! Heap and allocation profiles from allocator and process statistics.
//!
//! With the `jemalloc` feature the numbers come from jemalloc's own
//! counters (`tikv-jemalloc-ctl`). Without it only process-level figures
//! are available (`memory-stats`, plus `/proc/self/status` on Linux).

use std::io;
use tracing::debug;

use super::proto::{self, ProfileBuilder};

/// One reading of the allocator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySnapshot {
    pub allocator: &'static str,
    /// `(name, bytes)`; names are stable across calls.
    pub fields: Vec<(&'static str, u64)>,
}

impl MemorySnapshot {
    /// Read the current figures.
    #[must_use]
    pub fn capture() -> Self {
        let mut fields = Vec::new();
        let allocator = capture_allocator(&mut fields);

        if let Some(usage) = memory_stats::memory_stats() {
            fields.push(("physical_mem", usage.physical_mem as u64));
            fields.push(("virtual_mem", usage.virtual_mem as u64));
        }
        fields.extend(proc_status_fields());
        MemorySnapshot { allocator, fields }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<u64> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    /// `debug>0` text output, `title` is `heap` or `allocs`.
    #[must_use]
    pub fn to_text(&self, title: &str) -> String {
        let mut out = format!(
            "{title} profile: {} fields @ allocator/{}\n",
            self.fields.len(),
            self.allocator
        );
        for (name, value) in &self.fields {
            out.push_str(&format!("# {name} = {value}\n"));
        }
        out
    }

    /// Gzipped protobuf; `sample_type` names the default index.
    ///
    /// # Errors
    ///
    /// Fails if encoding or compression fails.
    pub fn to_pprof(&self, sample_type: &str) -> io::Result<Vec<u8>> {
        let mut builder = ProfileBuilder::new(&[(sample_type, "bytes")]).period("space", "bytes", 1);
        for (name, value) in &self.fields {
            builder.sample(
                vec![i64::try_from(*value).unwrap_or(i64::MAX)],
                &[("stat", *name), ("allocator", self.allocator)],
            );
        }
        proto::encode_gzipped(&builder.build())
    }
}

/// Refresh allocator statistics ahead of a `gc=1` heap profile.
pub fn collect_garbage() {
    #[cfg(feature = "jemalloc")]
    {
        match tikv_jemalloc_ctl::epoch::advance() {
            Ok(epoch) => debug!(epoch, "jemalloc statistics refreshed"),
            Err(err) => tracing::warn!(error = %err, "jemalloc epoch advance failed"),
        }
    }
    #[cfg(not(feature = "jemalloc"))]
    debug!("gc requested but no allocator control is available");
}

#[cfg(feature = "jemalloc")]
fn capture_allocator(fields: &mut Vec<(&'static str, u64)>) -> &'static str {
    use tikv_jemalloc_ctl::{epoch, stats};

    if let Err(err) = epoch::advance() {
        tracing::warn!(error = %err, "jemalloc epoch advance failed");
    }
    let readings = [
        ("allocated", stats::allocated::read()),
        ("active", stats::active::read()),
        ("metadata", stats::metadata::read()),
        ("resident", stats::resident::read()),
        ("mapped", stats::mapped::read()),
        ("retained", stats::retained::read()),
    ];
    for (name, reading) in readings {
        match reading {
            Ok(bytes) => fields.push((name, bytes as u64)),
            Err(err) => tracing::warn!(stat = name, error = %err, "jemalloc stat unavailable"),
        }
    }
    "jemalloc"
}

#[cfg(not(feature = "jemalloc"))]
fn capture_allocator(_fields: &mut Vec<(&'static str, u64)>) -> &'static str {
    "system"
}

#[cfg(target_os = "linux")]
fn proc_status_fields() -> Vec<(&'static str, u64)> {
    const WANTED: [(&str, &str); 4] = [
        ("VmPeak:", "vm_peak"),
        ("VmHWM:", "vm_hwm"),
        ("RssAnon:", "rss_anon"),
        ("VmData:", "vm_data"),
    ];
    let Ok(status) = std::fs::read_to_string("/proc/self/status") else {
        return Vec::new();
    };
    status
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let key = parts.next()?;
            let (_, name) = WANTED.iter().find(|(k, _)| *k == key)?;
            let kb: u64 = parts.next()?.parse().ok()?;
            Some((*name, kb * 1024))
        })
        .collect()
}

#[cfg(not(target_os = "linux"))]
fn proc_status_fields() -> Vec<(&'static str, u64)> {
    Vec::new()
}
