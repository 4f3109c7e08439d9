use tracing::debug;

use super::{Middleware, Next};
use crate::context::RequestContext;

/// Rejects requests whose credential header does not carry the expected token.
///
/// On mismatch the chain is short-circuited with a 401 and a small JSON body;
/// neither later middleware nor the handler run.
pub struct AuthMiddleware {
    header: String,
    token: String,
}

impl AuthMiddleware {
    /// Check the `authorization` header against `token`.
    #[must_use]
    pub fn new(token: String) -> Self {
        Self::with_header("authorization", token)
    }

    /// Check an arbitrary header (e.g. `x-api-key`) against `token`.
    #[must_use]
    pub fn with_header(header: &str, token: String) -> Self {
        Self {
            header: header.to_ascii_lowercase(),
            token,
        }
    }
}

impl Middleware for AuthMiddleware {
    fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> anyhow::Result<()> {
        match ctx.header(&self.header) {
            Some(value) if value == self.token => next.run(ctx),
            _ => {
                debug!(
                    request_id = %ctx.request_id(),
                    header = %self.header,
                    "Rejecting unauthenticated request"
                );
                ctx.set_status(401)
                    .json(&serde_json::json!({ "error": "Unauthorized" }))?;
                Ok(())
            }
        }
    }
}
