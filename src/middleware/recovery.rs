use tracing::error;

use super::{Middleware, Next};
use crate::context::RequestContext;

/// Turns errors from the layers below it into a response of its own.
///
/// The error is logged and suppressed, so it never reaches the dispatcher's
/// 500 boundary; the dispatcher sees a normal return. Whatever partial body
/// the failed layer wrote is replaced.
pub struct RecoveryMiddleware {
    status: u16,
    body: String,
}

impl RecoveryMiddleware {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

impl Default for RecoveryMiddleware {
    /// 503 with a generic body.
    fn default() -> Self {
        Self::new(503, "Service Unavailable")
    }
}

impl Middleware for RecoveryMiddleware {
    fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> anyhow::Result<()> {
        if let Err(err) = next.run(ctx) {
            error!(
                request_id = %ctx.request_id(),
                path = %ctx.path(),
                error = %err,
                substituted_status = self.status,
                "Recovered from handler error"
            );
            ctx.set_status(self.status).text(self.body.clone());
        }
        Ok(())
    }
}
