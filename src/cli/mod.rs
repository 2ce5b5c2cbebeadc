//! # CLI Module
//!
//! Command line for the `brrtrouter-pprof` demo binary.
//!
//! ### `serve`
//!
//! ```bash
//! brrtrouter-pprof serve --addr 0.0.0.0:8080
//! brrtrouter-pprof serve --prefix dev/pprof
//! brrtrouter-pprof serve --group /admin --token secret --fgprof
//! ```
//!
//! Mounts the pprof routes at the prefix, `GET /ping`, and optionally the
//! fgprof route. With `--group`, the group also gets `/ping`, `pprof/` and
//! (with `--fgprof`) `fgprof/`, guarded by `Authorization: Bearer <token>`
//! when `--token` is set. SIGINT and SIGTERM stop the server.
//!
//! ### `routes`
//!
//! Prints the routing table the same flags would produce.

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{build_router, run_cli, Cli, Commands, RouteArgs};
