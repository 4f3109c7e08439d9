use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::{Middleware, Next};
use crate::context::RequestContext;

/// Middleware collecting request statistics
///
/// All counters are atomics updated with `Ordering::Relaxed`, so the
/// middleware can be shared by every worker thread without locks. Values are
/// eventually consistent. Register it as an `Arc` and keep a clone to read
/// the counters.
///
/// Metrics collected:
/// - Total request count
/// - Requests whose inner chain returned an error
/// - Responses by status class (4xx, 5xx)
/// - Average latency of the inner chain
#[derive(Debug, Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    error_count: AtomicUsize,
    client_errors: AtomicUsize,
    server_errors: AtomicUsize,
    total_latency_ns: AtomicU64,
}

impl MetricsMiddleware {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Requests for which a deeper layer returned an error.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Responses with a 4xx status when the chain unwound.
    #[must_use]
    pub fn client_error_count(&self) -> usize {
        self.client_errors.load(Ordering::Relaxed)
    }

    /// Responses with a 5xx status when the chain unwound.
    ///
    /// Errors converted to 500 by the dispatcher happen outside the chain and
    /// are counted by [`error_count`](Self::error_count) instead.
    #[must_use]
    pub fn server_error_count(&self) -> usize {
        self.server_errors.load(Ordering::Relaxed)
    }

    /// Mean time spent in the layers below this middleware.
    ///
    /// Returns zero duration if no requests have been processed yet.
    #[must_use]
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }
}

impl Middleware for MetricsMiddleware {
    fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> anyhow::Result<()> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();

        let result = next.run(ctx);

        self.total_latency_ns
            .fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);
        match &result {
            Err(_) => {
                self.error_count.fetch_add(1, Ordering::Relaxed);
            }
            Ok(()) => match ctx.status() {
                400..=499 => {
                    self.client_errors.fetch_add(1, Ordering::Relaxed);
                }
                500..=599 => {
                    self.server_errors.fetch_add(1, Ordering::Relaxed);
                }
                _ => {}
            },
        }
        result
    }
}
