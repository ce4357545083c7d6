//! Prometheus metrics for inbound request handling.

use std::{ops::Deref, sync::Arc, time::Duration};

use prometheus_client::{
    metrics::{
        counter::Counter,
        histogram::{exponential_buckets, Histogram},
    },
    registry::Registry,
};

#[derive(Clone, Debug)]
pub struct RequestHandlerStats(Arc<Inner>);

impl Deref for RequestHandlerStats {
    type Target = Inner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug)]
pub struct Inner {
    time_until_deadline: Histogram,
    deadline_dropped: Counter,
}

impl RequestHandlerStats {
    pub fn new() -> Self {
        Self(Arc::new(Inner {
            time_until_deadline: Histogram::new(exponential_buckets(0.01, 2.0, 10)),
            deadline_dropped: Counter::default(),
        }))
    }

    pub fn register(&self, registry: &mut Registry) {
        let sub = registry.sub_registry_with_prefix("peer");
        sub.register(
            "request_time_until_deadline_seconds",
            "Remaining handling time when an inbound request arrives",
            self.time_until_deadline.clone(),
        );
        sub.register(
            "requests_dropped_past_deadline",
            "Inbound requests dropped because their deadline already expired",
            self.deadline_dropped.clone(),
        );
    }

    pub fn observe_time_until_deadline(&self, remaining: Duration) {
        self.time_until_deadline.observe(remaining.as_secs_f64());
    }

    pub fn inc_deadline_dropped(&self) {
        self.deadline_dropped.inc();
    }

    /// Number of requests dropped so far; test observability.
    pub fn deadline_dropped_count(&self) -> u64 {
        self.deadline_dropped.get()
    }
}

impl Default for RequestHandlerStats {
    fn default() -> Self {
        Self::new()
    }
}
