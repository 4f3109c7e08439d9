//! # Middleware Module
//!
//! Middleware wraps the terminal handler in onion order: the first
//! registered middleware is the outermost layer, so its "before" code runs
//! first and its "after" code runs last.
//!
//! ```text
//! M1-before -> M2-before -> handler -> M2-after -> M1-after
//! ```
//!
//! A middleware is any [`Middleware`] implementation or any
//! `Fn(&mut RequestContext, Next<'_>) -> anyhow::Result<()>`. It continues the
//! chain with [`Next::run`], or returns without calling it to answer the
//! request itself.
//!
//! ## Built-in middleware
//!
//! - [`TracingMiddleware`] - request span with status and latency
//! - [`MetricsMiddleware`] - atomic request/error/latency counters
//! - [`AuthMiddleware`] - header token check, 401 short-circuit
//! - [`RecoveryMiddleware`] - converts errors from inner layers into a response

mod auth;
mod core;
mod metrics;
mod recovery;
mod tracing;

pub use auth::AuthMiddleware;
pub use core::{ComposedHandler, Flow, Middleware, MiddlewareChain, Next};
pub use metrics::MetricsMiddleware;
pub use recovery::RecoveryMiddleware;
pub use tracing::TracingMiddleware;
