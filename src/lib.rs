//! # switchyard
//!
//! **switchyard** is an embeddable HTTP request-dispatch core. Given a decoded
//! request it picks the handler to run, extracts path parameters, and threads
//! the request through an ordered middleware chain before and after that
//! handler. Sockets, TLS and process lifecycle belong to the host; switchyard
//! only meets them at an `http::Request` / `http::Response` boundary.
//!
//! ## Architecture
//!
//! - **[`router`]** - per-method route trie with static, `:param` and `*wildcard` segments
//! - **[`middleware`]** - onion-ordered middleware and the [`Next`](middleware::Next) continuation
//! - **[`dispatcher`]** - resolve, compose, invoke; 404 for unmatched paths, 500 for failures
//! - **[`context`]** - the per-request [`RequestContext`](context::RequestContext)
//! - **[`template`]** - pluggable template rendering with a MiniJinja backend
//! - **[`logging`]** - structured `tracing` setup
//! - **[`runtime_config`]** - dispatcher failure behavior from env or YAML
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host
//!     participant D as Dispatcher
//!     participant R as Router
//!     participant M as Middleware
//!     participant H as Handler
//!
//!     Host->>D: dispatch(&mut ctx)
//!     D->>R: resolve(method, path, ctx)
//!     R-->>D: handler, params bound in ctx
//!     D->>M: M0 before, M1 before ...
//!     M->>H: handle(ctx)
//!     H-->>M: Ok / Err
//!     M-->>D: ... M1 after, M0 after
//!     D-->>Host: DispatchOutcome, response state in ctx
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use http::Method;
//! use switchyard::context::RequestContext;
//! use switchyard::dispatcher::Dispatcher;
//! use switchyard::middleware::{Next, TracingMiddleware};
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.add_middleware(Arc::new(TracingMiddleware));
//! dispatcher.add_middleware_fn(|ctx: &mut RequestContext, next: Next<'_>| {
//!     next.run(ctx)?;
//!     ctx.set_header("x-powered-by", "switchyard");
//!     Ok(())
//! });
//! dispatcher
//!     .get("/pets/:id", |ctx: &mut RequestContext| {
//!         let id = ctx.param("id").unwrap_or_default().to_owned();
//!         ctx.json(&serde_json::json!({ "id": id }))?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let dispatcher = Arc::new(dispatcher);
//! let response = dispatcher.handle(
//!     http::Request::builder()
//!         .method(Method::GET)
//!         .uri("/pets/7?verbose=1")
//!         .body(Vec::new())
//!         .unwrap(),
//! );
//! assert_eq!(response.status(), 200);
//! assert_eq!(response.body(), br#"{"id":"7"}"#);
//! ```

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod template;

pub use context::RequestContext;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::RouteError;
pub use handler::Handler;
pub use middleware::{Middleware, MiddlewareChain, Next};
pub use router::Router;
pub use runtime_config::DispatchConfig;
pub use template::{MiniJinjaRenderer, TemplateError, TemplateRenderer};
