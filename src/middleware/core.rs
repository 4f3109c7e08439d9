use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::context::RequestContext;
use crate::handler::Handler;

/// Cross-cutting request processing wrapped around a terminal handler.
///
/// A middleware receives the context and a [`Next`] continuation. Code before
/// `next.run(ctx)` runs on the way in, code after it on the way out. Not
/// calling `next.run` short-circuits the chain: nothing deeper runs and the
/// response state the middleware set stands.
///
/// `Next::run` takes `self`, so the continuation can be invoked at most once.
///
/// Errors from deeper layers arrive as the `Err` of `next.run`; returning them
/// (usually via `?`) propagates outward, handling them suppresses them.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> anyhow::Result<()>;
}

impl<F> Middleware for F
where
    F: Fn(&mut RequestContext, Next<'_>) -> anyhow::Result<()> + Send + Sync,
{
    #[inline]
    fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> anyhow::Result<()> {
        self(ctx, next)
    }
}

/// The rest of the chain, as seen from one middleware.
///
/// `Next` is `Send`, so a middleware may run the continuation on another
/// thread (e.g. a scoped worker racing a deadline).
pub struct Next<'a> {
    remaining: &'a [Arc<dyn Middleware>],
    terminal: &'a dyn Handler,
    reached: &'a AtomicBool,
}

impl Next<'_> {
    /// Run the next middleware, or the terminal handler if none are left.
    pub fn run(self, ctx: &mut RequestContext) -> anyhow::Result<()> {
        match self.remaining.split_first() {
            Some((mw, rest)) => mw.handle(
                ctx,
                Next {
                    remaining: rest,
                    terminal: self.terminal,
                    reached: self.reached,
                },
            ),
            None => {
                self.reached.store(true, Ordering::Relaxed);
                self.terminal.handle(ctx)
            }
        }
    }

    /// Number of middleware still ahead of the terminal handler.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.remaining.len())
            .finish_non_exhaustive()
    }
}

/// How a composed handler finished when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Every middleware continued and the terminal handler ran
    Completed,
    /// Some middleware returned without calling its continuation
    ShortCircuited,
}

/// Ordered middleware list, in registration order.
///
/// Append-only while configuring; [`build`](MiddlewareChain::build) borrows it
/// immutably, so a shared chain can compose handlers for many concurrent
/// requests.
#[derive(Default, Clone)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware; it runs after every middleware added before it.
    pub fn push(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Compose the chain around `terminal`.
    ///
    /// Equivalent to folding the middleware in reverse registration order,
    /// each layer wrapping the one built before it, so that running the result
    /// gives `M0-before, M1-before, .., terminal, .., M1-after, M0-after`. The
    /// composed handler only borrows the chain and the terminal handler.
    #[must_use]
    pub fn build<'a>(&'a self, terminal: &'a dyn Handler) -> ComposedHandler<'a> {
        ComposedHandler {
            layers: &self.middlewares,
            terminal,
        }
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.middlewares.len())
            .finish()
    }
}

/// A terminal handler wrapped in the full middleware chain.
pub struct ComposedHandler<'a> {
    layers: &'a [Arc<dyn Middleware>],
    terminal: &'a dyn Handler,
}

impl ComposedHandler<'_> {
    /// Run the chain once for `ctx`.
    ///
    /// # Errors
    ///
    /// Any error raised by a middleware or the terminal handler that no
    /// middleware suppressed.
    pub fn call(&self, ctx: &mut RequestContext) -> anyhow::Result<Flow> {
        let reached = AtomicBool::new(false);
        Next {
            remaining: self.layers,
            terminal: self.terminal,
            reached: &reached,
        }
        .run(ctx)?;

        Ok(if reached.load(Ordering::Relaxed) {
            Flow::Completed
        } else {
            Flow::ShortCircuited
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    fn tagging(log: &Log, tag: &'static str) -> Arc<dyn Middleware> {
        let log = Arc::clone(log);
        Arc::new(move |ctx: &mut RequestContext, next: Next<'_>| -> anyhow::Result<()> {
            log.lock().unwrap().push(format!("{tag}-before"));
            let result = next.run(ctx);
            log.lock().unwrap().push(format!("{tag}-after"));
            result
        })
    }

    #[test]
    fn test_empty_chain_runs_terminal() {
        let chain = MiddlewareChain::new();
        let terminal = |ctx: &mut RequestContext| -> anyhow::Result<()> {
            ctx.set_status(204);
            Ok(())
        };
        let mut ctx = RequestContext::new(Method::GET, "/");
        let flow = chain.build(&terminal).call(&mut ctx).unwrap();
        assert_eq!(flow, Flow::Completed);
        assert_eq!(ctx.status(), 204);
    }

    #[test]
    fn test_onion_order() {
        let log: Log = Arc::default();
        let mut chain = MiddlewareChain::new();
        chain.push(tagging(&log, "m1"));
        chain.push(tagging(&log, "m2"));

        let terminal_log = Arc::clone(&log);
        let terminal = move |_: &mut RequestContext| -> anyhow::Result<()> {
            terminal_log.lock().unwrap().push("h".to_string());
            Ok(())
        };

        let mut ctx = RequestContext::new(Method::GET, "/");
        chain.build(&terminal).call(&mut ctx).unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            ["m1-before", "m2-before", "h", "m2-after", "m1-after"]
        );
    }

    #[test]
    fn test_short_circuit_reported() {
        let mut chain = MiddlewareChain::new();
        chain.push(Arc::new(
            |ctx: &mut RequestContext, _next: Next<'_>| -> anyhow::Result<()> {
                ctx.set_status(401);
                Ok(())
            },
        ));
        let terminal = |ctx: &mut RequestContext| -> anyhow::Result<()> {
            ctx.set_status(200);
            Ok(())
        };
        let mut ctx = RequestContext::new(Method::GET, "/");
        let flow = chain.build(&terminal).call(&mut ctx).unwrap();
        assert_eq!(flow, Flow::ShortCircuited);
        assert_eq!(ctx.status(), 401);
    }

    #[test]
    fn test_continuation_runs_on_worker_thread() {
        fn assert_send<T: Send>() {}
        assert_send::<Next<'static>>();

        let mut chain = MiddlewareChain::new();
        chain.push(Arc::new(
            |ctx: &mut RequestContext, next: Next<'_>| -> anyhow::Result<()> {
                let caller = std::thread::current().id();
                std::thread::scope(|s| {
                    s.spawn(move || {
                        ctx.set_attribute("off_thread", std::thread::current().id() != caller);
                        next.run(ctx)
                    })
                    .join()
                    .unwrap_or_else(|_| Err(anyhow::anyhow!("worker panicked")))
                })
            },
        ));
        let terminal = |ctx: &mut RequestContext| -> anyhow::Result<()> {
            ctx.set_status(202);
            Ok(())
        };
        let mut ctx = RequestContext::new(Method::GET, "/");
        let flow = chain.build(&terminal).call(&mut ctx).unwrap();
        assert_eq!(flow, Flow::Completed);
        assert_eq!(ctx.status(), 202);
        assert_eq!(ctx.attribute::<bool>("off_thread"), Some(&true));
    }

    #[test]
    fn test_next_reports_remaining() {
        let mut chain = MiddlewareChain::new();
        for _ in 0..3 {
            chain.push(Arc::new(
                |ctx: &mut RequestContext, next: Next<'_>| -> anyhow::Result<()> {
                    let depth = ctx.attribute::<Vec<usize>>("depth").cloned();
                    let mut depth = depth.unwrap_or_default();
                    depth.push(next.remaining());
                    ctx.set_attribute("depth", depth);
                    next.run(ctx)
                },
            ));
        }
        let terminal = |_: &mut RequestContext| -> anyhow::Result<()> { Ok(()) };
        let mut ctx = RequestContext::new(Method::GET, "/");
        chain.build(&terminal).call(&mut ctx).unwrap();
        assert_eq!(ctx.attribute::<Vec<usize>>("depth"), Some(&vec![2, 1, 0]));
    }
}
