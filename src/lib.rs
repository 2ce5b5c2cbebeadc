//! # brrtrouter-pprof
//!
//! Runs handlers written against the `http` crate's request/response model
//! inside BRRTRouter's coroutine-driven `may_minihttp` pipeline, and uses that
//! to mount pprof-compatible profiling endpoints on the router.
//!
//! ## Overview
//!
//! The server side of the router works on a pooled [`context::RequestContext`]:
//! one per connection, reset and reused between keep-alive requests. Handlers
//! from the wider ecosystem expect an owned `http::Request` and a writer that
//! commits the status line on first write. The [`adaptor`] module bridges the
//! two, and [`pprof`] / [`fgprof`] register a table of ready-made profiling
//! handlers from [`profiles`] under a prefix.
//!
//! ## Architecture
//!
//! - **[`context`]** - pooled request/response buffers and per-request keys
//! - **[`adaptor`]** - `http::Request` view, `ResponseWriter`, content sniffing
//! - **[`router`]** - radix-tree routing with groups and middleware
//! - **[`middleware`]** - before/after hooks: bearer auth, request logging
//! - **[`server`]** - `may_minihttp` service and server lifecycle
//! - **[`profiles`]** - CPU, heap, thread, contention and symbol handlers
//! - **[`pprof`]** / **[`fgprof`]** - route table builders
//! - **[`ut`]** - in-process requests for tests
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as HttpServer<br/>(may_minihttp)
//!     participant Router as Router
//!     participant MW as Middleware Chain
//!     participant Adaptor as adapt()
//!     participant Handler as http handler
//!
//!     Client->>Server: GET /debug/pprof/heap
//!     Server->>Server: copy_request into pooled RequestContext
//!     Server->>Router: serve(ctx)
//!     Router->>MW: before()
//!     MW->>Adaptor: HandlerFunc(ctx)
//!     Adaptor->>Adaptor: compat_request(ctx)
//!     Adaptor->>Handler: serve_http(writer, request)
//!     Handler-->>Adaptor: headers, status, body via ResponseWriter
//!     Adaptor->>Adaptor: sniff Content-Type if unset
//!     Router->>MW: after()
//!     Server->>Client: write_response(ctx)
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use brrtrouter_pprof::{pprof, router::Router, server::HttpServer};
//!
//! let mut router = Router::with_defaults();
//! pprof::register(&mut router, &[]);
//!
//! let handle = HttpServer::from_router(router).start("0.0.0.0:8080")?;
//! handle.join().ok();
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! ## Runtime Considerations
//!
//! - Everything runs on `may` coroutines, not tokio
//! - Stack size is configurable via `BRRTR_STACK_SIZE`; symbolizing deep
//!   stacks during CPU profiling wants `0x8000` or more
//! - Profile handlers sleep with `may::coroutine::sleep`, so a running profile
//!   does not hold a worker thread
//! - The CPU profiler is process-wide: one CPU profile, trace or fgprof
//!   sample at a time

pub mod adaptor;
pub mod cli;
pub mod context;
pub mod fgprof;
pub mod ids;
pub mod middleware;
pub mod otel;
pub mod pprof;
pub mod profiles;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod ut;

pub use adaptor::{adapt, CompatRequest, CompatRequestExt, HttpHandler, ResponseWriter};
pub use context::RequestContext;
pub use router::{Router, RouterGroup};
