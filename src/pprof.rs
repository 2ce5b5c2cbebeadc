//! # Route Table Builder
//!
//! Mounts the [`profiles`](crate::profiles) handlers under one prefix:
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET | `{prefix}/` | [`profiles::index`] |
//! | GET | `{prefix}/cmdline` | [`profiles::cmdline`] |
//! | GET | `{prefix}/profile` | [`profiles::profile`] |
//! | GET, POST | `{prefix}/symbol` | [`profiles::symbol`] |
//! | GET | `{prefix}/trace` | [`profiles::trace`] |
//! | GET | `{prefix}/{name}` | [`profiles::handler`] for each named profile |
//!
//! ```rust
//! use brrtrouter_pprof::middleware::AuthMiddleware;
//! use brrtrouter_pprof::pprof;
//! use brrtrouter_pprof::router::Router;
//! use std::sync::Arc;
//!
//! let mut router = Router::new();
//! pprof::register(&mut router, &[]);
//!
//! let mut admin = router.group("/admin");
//! admin.use_middleware(Arc::new(AuthMiddleware::bearer("token")));
//! pprof::route_register(&mut admin, &["pprof"]);
//!
//! assert!(router.route(&http::Method::GET, "/debug/pprof/heap").is_some());
//! assert!(router.route(&http::Method::GET, "/admin/pprof/").is_some());
//! ```

use std::sync::Arc;
use tracing::info;

use crate::adaptor::adapt;
use crate::profiles::{self, ProfileKind};
use crate::router::{Router, RouterGroup};

/// Mount point used when no prefix is given.
pub const DEFAULT_PREFIX: &str = "/debug/pprof";

/// First of `prefix_options`, or [`DEFAULT_PREFIX`]. Later options are
/// ignored.
#[must_use]
pub fn get_prefix<'a>(prefix_options: &[&'a str]) -> &'a str {
    prefix_options.first().copied().unwrap_or(DEFAULT_PREFIX)
}

/// Mount the profiling routes at the router's root.
pub fn register(router: &mut Router, prefix_options: &[&str]) {
    let mut root = router.group("/");
    route_register(&mut root, prefix_options);
}

/// Mount the profiling routes under `group`, so they inherit its prefix and
/// middleware.
pub fn route_register(group: &mut RouterGroup<'_>, prefix_options: &[&str]) {
    let prefix = get_prefix(prefix_options);
    let mut routes = group.group(prefix);
    info!(prefix = %routes.base_path(), "Registering pprof routes");

    routes
        .get("/", adapt(profiles::index))
        .get("/cmdline", adapt(profiles::cmdline))
        .get("/profile", adapt(profiles::profile))
        .get("/trace", adapt(profiles::trace));

    let symbol = adapt(profiles::symbol);
    routes
        .post("/symbol", Arc::clone(&symbol))
        .get("/symbol", symbol);

    for kind in ProfileKind::ALL {
        routes.get(kind.name(), adapt(profiles::handler(kind.name())));
    }
}
