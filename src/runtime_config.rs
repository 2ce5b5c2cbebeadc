//! # Runtime Configuration Module
//!
//! Environment-driven settings for the server runtime and the profiling
//! endpoints.
//!
//! ## Environment Variables
//!
//! ### `BRRTR_STACK_SIZE`
//!
//! Coroutine stack size, decimal (`16384`) or hex (`0x4000`).
//! Default: `0x4000` (16 KB). Symbol resolution during profiling walks deep
//! stacks, so `0x8000` or more is a good choice when the profiling routes are
//! mounted.
//!
//! ### `BRRTR_WRITE_TIMEOUT_SECS`
//!
//! Upper bound, in seconds, for `seconds=` on the CPU profile and trace
//! endpoints. Requests asking for longer are rejected with 400. Unset means
//! no bound.
//!
//! ### `BRRTR_PPROF_PREFIX`
//!
//! Mount point used by the demo binary when `--prefix` is not given.
//!
//! ## Usage
//!
//! ```rust
//! use brrtrouter_pprof::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Stack size: {} bytes", config.stack_size);
//! ```

use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Default coroutine stack size.
pub const DEFAULT_STACK_SIZE: usize = 0x4000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes
    pub stack_size: usize,
    /// Longest profile/trace a client may request
    pub write_timeout: Option<Duration>,
    /// Prefix override for the demo binary
    pub pprof_prefix: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            write_timeout: None,
            pprof_prefix: None,
        }
    }
}

static PROCESS_CONFIG: Lazy<RuntimeConfig> = Lazy::new(RuntimeConfig::from_env);

/// Parse a size given in decimal or `0x` hex.
pub fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Configuration read once per process.
    pub fn global() -> &'static RuntimeConfig {
        &PROCESS_CONFIG
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let stack_size = lookup("BRRTR_STACK_SIZE")
            .and_then(|v| parse_size(&v))
            .unwrap_or(DEFAULT_STACK_SIZE);
        let write_timeout = lookup("BRRTR_WRITE_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64);
        let pprof_prefix = lookup("BRRTR_PPROF_PREFIX").filter(|p| !p.trim().is_empty());
        RuntimeConfig {
            stack_size,
            write_timeout,
            pprof_prefix,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> RuntimeConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RuntimeConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config(&[]), RuntimeConfig::default());
    }

    #[test]
    fn test_stack_size_formats() {
        assert_eq!(config(&[("BRRTR_STACK_SIZE", "0x8000")]).stack_size, 0x8000);
        assert_eq!(config(&[("BRRTR_STACK_SIZE", "32768")]).stack_size, 32768);
        assert_eq!(
            config(&[("BRRTR_STACK_SIZE", "lots")]).stack_size,
            DEFAULT_STACK_SIZE
        );
    }

    #[test]
    fn test_write_timeout_and_prefix() {
        let cfg = config(&[
            ("BRRTR_WRITE_TIMEOUT_SECS", "2.5"),
            ("BRRTR_PPROF_PREFIX", "/internal/pprof"),
        ]);
        assert_eq!(cfg.write_timeout, Some(Duration::from_millis(2500)));
        assert_eq!(cfg.pprof_prefix.as_deref(), Some("/internal/pprof"));

        let cfg = config(&[("BRRTR_WRITE_TIMEOUT_SECS", "-1"), ("BRRTR_PPROF_PREFIX", " ")]);
        assert_eq!(cfg.write_timeout, None);
        assert_eq!(cfg.pprof_prefix, None);
    }
}
