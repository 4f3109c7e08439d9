//! # Dispatcher Module
//!
//! The dispatcher ties routing and middleware into one request/response
//! cycle:
//!
//! 1. Resolve `(method, path)` through the [`Router`](crate::router::Router),
//!    binding path parameters into the context
//! 2. Choose the terminal step: the matched handler, or a 404 responder
//! 3. Wrap it in the [`MiddlewareChain`](crate::middleware::MiddlewareChain)
//!    and run it
//! 4. Convert anything that escaped (an error or a panic) into a 500
//!
//! ## Error Handling
//!
//! - Unmatched paths are not errors: they produce a 404 and still pass
//!   through every middleware
//! - Handler and middleware errors are logged and become 500 responses
//! - Handler panics are caught with `catch_unwind` and treated the same way
//! - Nothing propagates past [`Dispatcher::dispatch`] to the transport
//!
//! ## Concurrency
//!
//! `dispatch` takes `&self` and only reads the router and the chain. A fully
//! configured dispatcher can be wrapped in an `Arc` and driven from as many
//! worker threads as the host runs; each request brings its own
//! [`RequestContext`](crate::context::RequestContext).

mod core;

pub use core::{DispatchOutcome, Dispatcher};
