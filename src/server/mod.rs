//! may_minihttp integration.
//!
//! [`AppService`] copies each wire request into a pooled
//! [`RequestContext`](crate::context::RequestContext), runs the router and
//! copies the result back out. [`HttpServer`] starts it on a socket.

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::copy_request;
pub use response::{status_reason, write_response};
pub use service::AppService;
