use std::time::Instant;

use tracing::{field, info_span, warn};

use super::{Middleware, Next};
use crate::context::RequestContext;

/// Opens a `request` span around the rest of the chain.
///
/// The span carries the request id, method and path, and records the final
/// status and latency once the inner layers return. Errors are noted and
/// passed through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> anyhow::Result<()> {
        let span = info_span!(
            "request",
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = %ctx.path(),
            status = field::Empty,
            latency_us = field::Empty,
        );
        let _entered = span.enter();
        let start = Instant::now();

        let result = next.run(ctx);

        span.record("status", ctx.status());
        span.record("latency_us", start.elapsed().as_micros() as u64);
        if let Err(err) = &result {
            warn!(error = %err, "Request failed inside the chain");
        }
        result
    }
}
