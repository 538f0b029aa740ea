use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::StatusCode;

use super::{handler, Handler};

/// Request counters for a router pipeline
///
/// Tracks request counts, latency, and how requests were resolved.
/// All counters use atomic operations for thread-safe updates without locks.
///
/// Metrics collected:
/// - Total request count
/// - Average latency
/// - Requests that matched a route (`matched_route` set)
/// - 404, 405 and 501 outcomes
/// - Requests that ended in an error
#[derive(Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    routed: AtomicUsize,
    not_found: AtomicUsize,
    method_not_allowed: AtomicUsize,
    not_implemented: AtomicUsize,
    errors: AtomicUsize,
}

impl MetricsMiddleware {
    /// Create a new metrics middleware with all counters initialized to zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler that records into these counters; register it first in the chain.
    pub fn handler(self: &Arc<Self>) -> Handler {
        let metrics = Arc::clone(self);
        handler(move |ctx, next| {
            let start = Instant::now();
            let result = next.run(ctx);
            metrics.record_latency(start.elapsed());

            if result.is_err() {
                metrics.errors.fetch_add(1, Ordering::Relaxed);
                return result;
            }
            if ctx.matched_route.is_some() {
                metrics.routed.fetch_add(1, Ordering::Relaxed);
            }
            match ctx.status {
                None | Some(StatusCode::NOT_FOUND) => {
                    metrics.not_found.fetch_add(1, Ordering::Relaxed);
                }
                Some(StatusCode::METHOD_NOT_ALLOWED) => {
                    metrics.method_not_allowed.fetch_add(1, Ordering::Relaxed);
                }
                Some(StatusCode::NOT_IMPLEMENTED) => {
                    metrics.not_implemented.fetch_add(1, Ordering::Relaxed);
                }
                Some(_) => {}
            }
            result
        })
    }

    fn record_latency(&self, latency: Duration) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ns
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Get the total number of requests processed
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Calculate the average request latency
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            return Duration::from_nanos(0);
        }
        Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
    }

    pub fn routed_count(&self) -> usize {
        self.routed.load(Ordering::Relaxed)
    }

    pub fn not_found_count(&self) -> usize {
        self.not_found.load(Ordering::Relaxed)
    }

    pub fn method_not_allowed_count(&self) -> usize {
        self.method_not_allowed.load(Ordering::Relaxed)
    }

    pub fn not_implemented_count(&self) -> usize {
        self.not_implemented.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }
}
