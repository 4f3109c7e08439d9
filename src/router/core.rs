//! Router core module - hot path for request routing.

// Deny needless allocations in the hot path
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Method;
use tracing::{debug, info, warn};

use super::radix::{split_path, NodeKind, RouteNode};
use crate::context::RequestContext;
use crate::error::RouteError;
use crate::handler::Handler;

/// Resolution slower than this is logged as a warning.
const SLOW_MATCH_THRESHOLD: Duration = Duration::from_millis(1);

/// Per-method route trie mapping path patterns to handlers.
///
/// Routes are registered at configuration time through `&mut self`; once the
/// router is shared (typically inside an `Arc<Dispatcher>`) it is read-only and
/// concurrent [`resolve`](Router::resolve) calls need no locking.
///
/// # Example
///
/// ```rust
/// use http::Method;
/// use switchyard::context::RequestContext;
/// use switchyard::router::Router;
///
/// let mut router = Router::new();
/// router
///     .add_route(Method::GET, "/users/:id", |ctx: &mut RequestContext| {
///         ctx.set_status(200);
///         Ok(())
///     })
///     .unwrap();
///
/// let mut ctx = RequestContext::new(Method::GET, "/users/123");
/// assert!(router.resolve(&Method::GET, "/users/123", &mut ctx).is_some());
/// assert_eq!(ctx.param("id"), Some("123"));
/// ```
#[derive(Default)]
pub struct Router {
    /// One tree per method, created on first registration for that method
    roots: HashMap<Method, RouteNode>,
    route_count: usize,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closure handler for `method` and `pattern`.
    ///
    /// See [`Router::insert`] for the pattern rules.
    pub fn add_route<F>(&mut self, method: Method, pattern: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.insert(method, pattern, Arc::new(handler))
    }

    /// Register a handler for `method` and `pattern`.
    ///
    /// `pattern` is `/`-delimited; empty segments are ignored. A segment
    /// starting with `:` is a named parameter matching exactly one segment; a
    /// segment starting with `*` matches the rest of the path (`*` binds
    /// nothing, `*name` binds the remainder under `name`).
    ///
    /// Registering the same method and pattern again replaces the handler.
    /// Overlapping patterns are allowed.
    ///
    /// # Errors
    ///
    /// * [`RouteError::EmptyParamName`] - a bare `:` segment
    /// * [`RouteError::DuplicateParamName`] - a name bound twice in `pattern`
    pub fn insert(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<(), RouteError> {
        let segments = split_path(pattern);
        validate(pattern, &segments)?;

        if let Some(pos) = segments
            .iter()
            .position(|s| NodeKind::of(s) == NodeKind::Wildcard)
        {
            if pos + 1 < segments.len() {
                warn!(
                    method = %method,
                    pattern = %pattern,
                    "Segments after a wildcard can never match"
                );
            }
        }

        let root = self.roots.entry(method.clone()).or_insert_with(RouteNode::root);
        if root.insert(&segments, handler).is_some() {
            warn!(
                method = %method,
                pattern = %pattern,
                total_routes = self.route_count,
                "Replaced existing route handler"
            );
        } else {
            self.route_count += 1;
            info!(
                method = %method,
                pattern = %pattern,
                total_routes = self.route_count,
                "Route registered"
            );
        }
        Ok(())
    }

    /// Resolve `path` under `method` to a handler.
    ///
    /// Parameters bound along the matched branch are written into `ctx`.
    /// Returns `None` when no tree exists for `method` or no registered
    /// pattern matches the whole path; `ctx` is left untouched in that case.
    #[must_use]
    pub fn resolve<'r>(
        &'r self,
        method: &Method,
        path: &str,
        ctx: &mut RequestContext,
    ) -> Option<&'r Arc<dyn Handler>> {
        let match_start = Instant::now();

        let Some(root) = self.roots.get(method) else {
            debug!(
                request_id = %ctx.request_id(),
                method = %method,
                path = %path,
                "No routes registered for method"
            );
            return None;
        };

        let segments = split_path(path);
        let result = root.search(&segments, ctx);
        let match_duration = match_start.elapsed();

        match result {
            Some(handler) => {
                if match_duration > SLOW_MATCH_THRESHOLD {
                    warn!(
                        request_id = %ctx.request_id(),
                        method = %method,
                        path = %path,
                        path_params = ?ctx.params(),
                        duration_us = match_duration.as_micros(),
                        "Slow route matching detected"
                    );
                } else {
                    debug!(
                        request_id = %ctx.request_id(),
                        method = %method,
                        path = %path,
                        path_params = ?ctx.params(),
                        duration_us = match_duration.as_micros(),
                        "Route matched"
                    );
                }
                Some(handler)
            }
            None => {
                debug!(
                    request_id = %ctx.request_id(),
                    method = %method,
                    path = %path,
                    duration_us = match_duration.as_micros(),
                    "No route matched"
                );
                None
            }
        }
    }

    /// Number of distinct (method, pattern) routes registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.route_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }

    /// All registered routes as `(method, pattern)`, sorted for stable output.
    #[must_use]
    pub fn routes(&self) -> Vec<(Method, String)> {
        let mut out = Vec::with_capacity(self.route_count);
        for (method, root) in &self.roots {
            let mut patterns = Vec::new();
            root.collect_patterns("", &mut patterns);
            out.extend(patterns.into_iter().map(|p| (method.clone(), p)));
        }
        out.sort_by(|a, b| (a.0.as_str(), &a.1).cmp(&(b.0.as_str(), &b.1)));
        out
    }

    /// Log every registered route at info level.
    pub fn dump_routes(&self) {
        for (method, pattern) in self.routes() {
            info!(method = %method, pattern = %pattern, "Registered route");
        }
    }
}

fn validate(pattern: &str, segments: &[&str]) -> Result<(), RouteError> {
    let mut seen: HashSet<&str> = HashSet::new();
    for segment in segments {
        let name = match NodeKind::of(segment) {
            NodeKind::Static => continue,
            NodeKind::Param if segment.len() == 1 => {
                return Err(RouteError::EmptyParamName {
                    pattern: pattern.to_owned(),
                });
            }
            NodeKind::Wildcard if segment.len() == 1 => continue,
            NodeKind::Param | NodeKind::Wildcard => &segment[1..],
        };
        if !seen.insert(name) {
            return Err(RouteError::DuplicateParamName {
                pattern: pattern.to_owned(),
                name: name.to_owned(),
            });
        }
    }
    Ok(())
}
