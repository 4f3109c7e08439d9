use crate::context::RequestContext;

/// Application logic bound to a route.
///
/// A handler mutates the [`RequestContext`] (status, headers, body, attributes)
/// and signals failure by returning an error. Any
/// `Fn(&mut RequestContext) -> anyhow::Result<()>` that is `Send + Sync` is a
/// handler, so closures capturing their own state work directly.
///
/// Handlers run concurrently on whatever threads the host uses, hence the
/// `Send + Sync` bound.
pub trait Handler: Send + Sync {
    fn handle(&self, ctx: &mut RequestContext) -> anyhow::Result<()>;
}

impl<F> Handler for F
where
    F: Fn(&mut RequestContext) -> anyhow::Result<()> + Send + Sync,
{
    #[inline]
    fn handle(&self, ctx: &mut RequestContext) -> anyhow::Result<()> {
        self(ctx)
    }
}
