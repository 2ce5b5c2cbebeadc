//! # Router Module
//!
//! Maps `(method, path)` pairs to [`HandlerFunc`]s and drives the
//! middleware chain around them.
//!
//! ## Overview
//!
//! - Routes are stored in a radix tree keyed by path segment, so lookups cost
//!   O(path length) regardless of how many routes exist
//! - [`RouterGroup`]s share a prefix and group-level middleware, the way
//!   debug endpoints are usually mounted behind an auth check
//! - Unknown routes answer `404 page not found`
//! - A panicking handler is caught, logged and answered with a 500
//!
//! ## Example
//!
//! ```rust
//! use brrtrouter_pprof::context::RequestContext;
//! use brrtrouter_pprof::router::Router;
//! use std::sync::Arc;
//!
//! let mut router = Router::new();
//! router.get("/users/{id}", Arc::new(|ctx: &mut RequestContext| {
//!     let id = ctx.param("id").unwrap_or_default().to_string();
//!     ctx.string(200, &id);
//! }));
//!
//! let mut ctx = RequestContext::new();
//! ctx.request.set_request_uri("/users/42");
//! router.serve(&mut ctx);
//! assert_eq!(ctx.response.body(), b"42");
//! ```

mod core;
mod radix;

pub use self::core::{join_paths, HandlerFunc, Route, RouteMatch, Router, RouterGroup, NOT_FOUND_BODY};
