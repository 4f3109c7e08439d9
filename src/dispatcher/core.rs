//! Dispatcher core module - one request/response cycle.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use http::Method;
use tracing::{debug, error, info};

use crate::context::RequestContext;
use crate::error::RouteError;
use crate::handler::Handler;
use crate::middleware::{Flow, Middleware, MiddlewareChain, Next};
use crate::router::Router;
use crate::runtime_config::DispatchConfig;

/// What happened to a dispatched request.
///
/// By the time [`Dispatcher::dispatch`] returns, the context already holds the
/// matching response state; the outcome is for logging and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A route matched and its handler completed
    Handled,
    /// No route matched; a 404 went through the middleware chain
    NotFound,
    /// A middleware answered without calling its continuation
    ShortCircuited,
    /// An error or panic escaped the chain and was converted to a 500
    Failed,
}

/// Terminal step placed at the center of the middleware chain.
enum Terminal<'r> {
    Matched(&'r dyn Handler),
    NotFound { body: &'r str },
}

impl Handler for Terminal<'_> {
    fn handle(&self, ctx: &mut RequestContext) -> anyhow::Result<()> {
        match self {
            Terminal::Matched(handler) => {
                handler.handle(ctx)?;
                ctx.mark_ready();
            }
            Terminal::NotFound { body } => {
                ctx.set_status(404);
                if !body.is_empty() {
                    ctx.text(*body);
                }
            }
        }
        Ok(())
    }
}

/// Routes requests through the middleware chain to their handlers.
///
/// Owns its [`Router`], [`MiddlewareChain`] and [`DispatchConfig`]; several
/// independent dispatchers can live in one process. Configure it through the
/// `&mut self` registration methods, then share it (e.g. in an `Arc`) and call
/// [`dispatch`](Dispatcher::dispatch) concurrently from any number of threads.
///
/// # Example
///
/// ```rust
/// use switchyard::context::RequestContext;
/// use switchyard::dispatcher::{DispatchOutcome, Dispatcher};
/// use http::Method;
///
/// let mut dispatcher = Dispatcher::new();
/// dispatcher
///     .get("/hello/:name", |ctx: &mut RequestContext| {
///         let greeting = format!("hello {}", ctx.param("name").unwrap_or("nobody"));
///         ctx.text(greeting);
///         Ok(())
///     })
///     .unwrap();
///
/// let mut ctx = RequestContext::new(Method::GET, "/hello/world");
/// assert_eq!(dispatcher.dispatch(&mut ctx), DispatchOutcome::Handled);
/// assert_eq!(ctx.body(), b"hello world");
/// ```
#[derive(Default)]
pub struct Dispatcher {
    router: Router,
    middlewares: MiddlewareChain,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Create a dispatcher with default configuration and no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: DispatchConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn middleware(&self) -> &MiddlewareChain {
        &self.middlewares
    }

    /// Register a closure handler. See [`Router::insert`] for pattern rules.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] for malformed patterns.
    pub fn add_route<F>(&mut self, method: Method, pattern: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.router.add_route(method, pattern, handler)
    }

    /// Register an already shared handler.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] for malformed patterns.
    pub fn insert_route(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<(), RouteError> {
        self.router.insert(method, pattern, handler)
    }

    /// Register a `GET` route.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] for malformed patterns.
    pub fn get<F>(&mut self, pattern: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_route(Method::GET, pattern, handler)
    }

    /// Register a `POST` route.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] for malformed patterns.
    pub fn post<F>(&mut self, pattern: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_route(Method::POST, pattern, handler)
    }

    /// Register a `PUT` route.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] for malformed patterns.
    pub fn put<F>(&mut self, pattern: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_route(Method::PUT, pattern, handler)
    }

    /// Register a `DELETE` route.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] for malformed patterns.
    pub fn delete<F>(&mut self, pattern: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_route(Method::DELETE, pattern, handler)
    }

    /// Register a `PATCH` route.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] for malformed patterns.
    pub fn patch<F>(&mut self, pattern: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_route(Method::PATCH, pattern, handler)
    }

    /// Register a `HEAD` route.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] for malformed patterns.
    pub fn head<F>(&mut self, pattern: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_route(Method::HEAD, pattern, handler)
    }

    /// Register an `OPTIONS` route.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] for malformed patterns.
    pub fn options<F>(&mut self, pattern: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_route(Method::OPTIONS, pattern, handler)
    }

    /// Add middleware to the processing pipeline
    ///
    /// Middleware runs in the order it is added on the way in and in reverse
    /// order on the way out.
    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
        info!(
            middleware_count = self.middlewares.len(),
            "Middleware registered"
        );
    }

    /// Add a closure middleware.
    pub fn add_middleware_fn<F>(&mut self, mw: F)
    where
        F: Fn(&mut RequestContext, Next<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_middleware(Arc::new(mw));
    }

    /// Run one request through routing, middleware and its handler.
    ///
    /// Never fails: an unmatched path becomes a 404 that still passes through
    /// every middleware, and any error or panic escaping the chain is logged
    /// and replaced by a 500 whose body hides the error unless
    /// [`DispatchConfig::expose_error_detail`] is set.
    pub fn dispatch(&self, ctx: &mut RequestContext) -> DispatchOutcome {
        ctx.clear_params();
        let method = ctx.method().clone();
        let path = ctx.path().to_owned();

        let terminal = match self.router.resolve(&method, &path, ctx) {
            Some(handler) => Terminal::Matched(handler.as_ref()),
            None => Terminal::NotFound {
                body: &self.config.not_found_body,
            },
        };
        let unmatched = matches!(terminal, Terminal::NotFound { .. });
        let composed = self.middlewares.build(&terminal);

        let result = panic::catch_unwind(AssertUnwindSafe(|| composed.call(ctx)));

        let outcome = match result {
            Ok(Ok(Flow::Completed)) if unmatched => DispatchOutcome::NotFound,
            Ok(Ok(Flow::Completed)) => DispatchOutcome::Handled,
            Ok(Ok(Flow::ShortCircuited)) => DispatchOutcome::ShortCircuited,
            Ok(Err(err)) => {
                let detail = format!("{err:#}");
                error!(
                    request_id = %ctx.request_id(),
                    method = %method,
                    path = %path,
                    error = %detail,
                    "Request processing error"
                );
                self.fail(ctx, &detail);
                DispatchOutcome::Failed
            }
            Err(panic) => {
                let detail = panic_message(panic.as_ref());
                error!(
                    request_id = %ctx.request_id(),
                    method = %method,
                    path = %path,
                    panic_message = %detail,
                    "Handler panicked"
                );
                self.fail(ctx, &detail);
                DispatchOutcome::Failed
            }
        };

        debug!(
            request_id = %ctx.request_id(),
            method = %method,
            path = %path,
            status = ctx.status(),
            outcome = ?outcome,
            "Dispatch complete"
        );
        outcome
    }

    /// Transport convenience: dispatch a decoded request and build the response.
    ///
    /// The request id is echoed in the `x-request-id` response header.
    #[must_use]
    pub fn handle<B: Into<Vec<u8>>>(&self, req: http::Request<B>) -> http::Response<Vec<u8>> {
        let mut ctx = RequestContext::from_request(req);
        let _outcome = self.dispatch(&mut ctx);
        let request_id = ctx.request_id();
        let mut response = ctx.into_response();
        request_id.write_to(response.headers_mut());
        response
    }

    fn fail(&self, ctx: &mut RequestContext, detail: &str) {
        let body = if self.config.expose_error_detail {
            detail
        } else {
            self.config.error_body.as_str()
        };
        ctx.reset_response(500, body);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
