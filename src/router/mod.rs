//! # Router Module
//!
//! The router module associates `(HTTP method, path pattern)` pairs with
//! handlers and resolves concrete request paths back to a handler plus the
//! path parameters the pattern extracts.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Keeping one segment trie per HTTP method
//! - Registering patterns with static segments, `:name` parameters and
//!   trailing `*` / `*name` wildcards
//! - Resolving a request path with deterministic precedence
//!   (static > parameter > wildcard) and backtracking
//! - Writing extracted parameters into the [`RequestContext`](crate::context::RequestContext)
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use switchyard::context::RequestContext;
//! use switchyard::router::Router;
//!
//! let mut router = Router::new();
//! router
//!     .add_route(Method::GET, "/api/users/:id/posts/:postId", |_ctx: &mut RequestContext| Ok(()))
//!     .unwrap();
//!
//! let mut ctx = RequestContext::new(Method::GET, "/api/users/123/posts/456");
//! assert!(router.resolve(&Method::GET, "/api/users/123/posts/456", &mut ctx).is_some());
//! assert_eq!(ctx.param("id"), Some("123"));
//! assert_eq!(ctx.param("postId"), Some("456"));
//! ```
//!
//! ## Concurrency
//!
//! Registration needs `&mut Router`; resolution needs only `&Router` and never
//! mutates the tree, so a fully configured router can be shared across
//! threads without locks.

mod core;
mod radix;

pub use crate::context::{ParamVec, MAX_INLINE_PARAMS};
pub use core::Router;
