#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use http::Method;
use switchyard::context::RequestContext;
use switchyard::middleware::{Middleware, Next};

/// Install a test-writer subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("switchyard=debug")
        .with_test_writer()
        .try_init();
}

pub fn ctx(method: Method, path: &str) -> RequestContext {
    RequestContext::new(method, path)
}

/// Shared, ordered event log for asserting execution order.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Middleware logging `{tag}-before` and `{tag}-after` around `next`.
    pub fn layer(&self, tag: &'static str) -> Arc<dyn Middleware> {
        let rec = self.clone();
        Arc::new(move |ctx: &mut RequestContext, next: Next<'_>| -> anyhow::Result<()> {
            rec.push(format!("{tag}-before"));
            let result = next.run(ctx);
            rec.push(format!("{tag}-after"));
            result
        })
    }

    /// Handler logging `tag` and leaving the default 200.
    pub fn handler(
        &self,
        tag: &'static str,
    ) -> impl Fn(&mut RequestContext) -> anyhow::Result<()> + Send + Sync + 'static {
        let rec = self.clone();
        move |_ctx: &mut RequestContext| {
            rec.push(tag);
            Ok(())
        }
    }
}

/// Handler writing its own tag as the response body.
pub fn tagged(
    tag: &'static str,
) -> impl Fn(&mut RequestContext) -> anyhow::Result<()> + Send + Sync + 'static {
    move |ctx: &mut RequestContext| {
        ctx.text(tag);
        Ok(())
    }
}
