//! Connected-peer bookkeeping: versions and observed bandwidth.

use std::collections::HashMap;

use cerulean_types::{NodeId, NodeVersion};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Exponential moving average weight for new bandwidth samples.
const BANDWIDTH_ALPHA: f64 = 0.25;

#[derive(Clone, Debug, Default)]
struct PeerInfo {
    version: Option<NodeVersion>,
    bandwidth: f64,
    samples: u64,
}

impl PeerInfo {
    fn observe_bandwidth(&mut self, sample: f64) {
        if self.samples == 0 {
            self.bandwidth = sample;
        } else {
            self.bandwidth = self.bandwidth * (1.0 - BANDWIDTH_ALPHA) + sample * BANDWIDTH_ALPHA;
        }
        self.samples += 1;
    }
}

/// Tracks connected peers. Not thread-safe on its own; the network serializes
/// access through its lock.
pub struct PeerTracker {
    peers: HashMap<NodeId, PeerInfo>,
    rng: StdRng,
}

impl PeerTracker {
    pub fn new() -> Self {
        Self { peers: HashMap::new(), rng: StdRng::from_entropy() }
    }

    /// Deterministic selection order for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self { peers: HashMap::new(), rng: StdRng::seed_from_u64(seed) }
    }

    pub fn connected(&mut self, node_id: NodeId, version: NodeVersion) {
        self.peers.entry(node_id).or_default().version = Some(version);
    }

    pub fn disconnected(&mut self, node_id: &NodeId) {
        self.peers.remove(node_id);
    }

    /// Idempotent insert of a peer we intend to reach, version unknown.
    pub fn track_peer(&mut self, node_id: NodeId) {
        self.peers.entry(node_id).or_default();
    }

    /// Record a bandwidth observation: response bytes over elapsed time, or
    /// zero for an invalid response.
    pub fn track_bandwidth(&mut self, node_id: NodeId, bandwidth: f64) {
        self.peers.entry(node_id).or_default().observe_bandwidth(bandwidth);
    }

    pub fn bandwidth(&self, node_id: &NodeId) -> Option<f64> {
        self.peers.get(node_id).map(|peer| peer.bandwidth)
    }

    /// An arbitrary peer with a version at least `min_version` (any versioned
    /// peer when `None`). Selection is uniform over the qualifying peers, so
    /// no peer is starved over time.
    pub fn get_any_peer(&mut self, min_version: Option<&NodeVersion>) -> Option<NodeId> {
        let qualifying: Vec<NodeId> = self
            .peers
            .iter()
            .filter(|(_, info)| match (min_version, info.version) {
                (None, _) => true,
                (Some(min), Some(version)) => version >= *min,
                (Some(_), None) => false,
            })
            .map(|(node_id, _)| *node_id)
            .collect();
        if qualifying.is_empty() {
            return None;
        }
        Some(qualifying[self.rng.gen_range(0..qualifying.len())])
    }

    pub fn size(&self) -> usize {
        self.peers.len()
    }
}

impl Default for PeerTracker {
    fn default() -> Self {
        Self::new()
    }
}
