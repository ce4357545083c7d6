//! Prometheus metrics for block assembly.

use std::{ops::Deref, sync::Arc, time::Duration};

use prometheus_client::{
    metrics::{
        counter::Counter,
        gauge::Gauge,
        histogram::{exponential_buckets, Histogram},
    },
    registry::Registry,
};

#[derive(Clone, Debug)]
pub struct MinerMetrics(Arc<Inner>);

impl Deref for MinerMetrics {
    type Target = Inner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug)]
pub struct Inner {
    blocks_built: Counter,
    txs_included: Counter,
    build_time: Histogram,
    last_block_gas_used: Gauge,
}

impl Inner {
    fn new() -> Self {
        Self {
            blocks_built: Counter::default(),
            txs_included: Counter::default(),
            build_time: Histogram::new(exponential_buckets(0.001, 2.0, 12)),
            last_block_gas_used: Gauge::default(),
        }
    }
}

impl MinerMetrics {
    pub fn new() -> Self {
        Self(Arc::new(Inner::new()))
    }

    pub fn register(&self, registry: &mut Registry) {
        let sub = registry.sub_registry_with_prefix("miner");
        sub.register("blocks_built", "Blocks assembled", self.blocks_built.clone());
        sub.register("txs_included", "Transactions packed into blocks", self.txs_included.clone());
        sub.register("build_time_seconds", "Wall-clock block build time", self.build_time.clone());
        sub.register(
            "last_block_gas_used",
            "Gas used by the most recently assembled block",
            self.last_block_gas_used.clone(),
        );
    }

    pub fn observe_build(&self, tx_count: usize, gas_used: u64, elapsed: Duration) {
        self.blocks_built.inc();
        self.txs_included.inc_by(tx_count as u64);
        self.build_time.observe(elapsed.as_secs_f64());
        self.last_block_gas_used.set(gas_used as i64);
    }
}

impl Default for MinerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
