//! Chain configuration: the fork-activation schedule and the boolean rule set
//! derived from it for a particular block.
//!
//! Network upgrades activate at a wall-clock timestamp (the chain produces
//! blocks on validator cadence, not at a fixed interval), except for the
//! replay-protection fork which is gated on block number for compatibility
//! with its upstream definition.

use serde::{Deserialize, Serialize};

use crate::aliases::Address;

/// A scheduled stateful-precompile activation applied to the state when the
/// first block at or after `activate_at` is produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecompileUpgrade {
    pub address: Address,
    pub activate_at: u64,
}

/// Fork schedule for a Cerulean chain. A `None` timestamp means the upgrade
/// is not scheduled.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Block number activating replay protection (chain-id-bound signatures).
    pub eip155_block: Option<u64>,
    pub apricot_phase1_time: Option<u64>,
    /// ApricotPhase3 introduces the dynamic base fee.
    pub apricot_phase3_time: Option<u64>,
    pub cortina_time: Option<u64>,
    /// Durango introduces predicate precompiles.
    pub durango_time: Option<u64>,
    /// The blob fork: blob transactions, blob-gas accounting, and the parent
    /// beacon root.
    pub cancun_time: Option<u64>,
    #[serde(default)]
    pub precompile_upgrades: Vec<PrecompileUpgrade>,
}

impl ChainConfig {
    /// A schedule with every upgrade active from genesis. The default for new
    /// networks and the usual configuration in tests.
    pub fn fully_activated(chain_id: u64) -> Self {
        Self {
            chain_id,
            eip155_block: Some(0),
            apricot_phase1_time: Some(0),
            apricot_phase3_time: Some(0),
            cortina_time: Some(0),
            durango_time: Some(0),
            cancun_time: Some(0),
            precompile_upgrades: Vec::new(),
        }
    }

    pub fn is_eip155(&self, number: u64) -> bool {
        self.eip155_block.is_some_and(|block| number >= block)
    }

    pub fn is_apricot_phase1(&self, time: u64) -> bool {
        self.apricot_phase1_time.is_some_and(|at| time >= at)
    }

    pub fn is_apricot_phase3(&self, time: u64) -> bool {
        self.apricot_phase3_time.is_some_and(|at| time >= at)
    }

    pub fn is_cortina(&self, time: u64) -> bool {
        self.cortina_time.is_some_and(|at| time >= at)
    }

    pub fn is_durango(&self, time: u64) -> bool {
        self.durango_time.is_some_and(|at| time >= at)
    }

    pub fn is_cancun(&self, _number: u64, time: u64) -> bool {
        self.cancun_time.is_some_and(|at| time >= at)
    }

    /// Upgrades that come into effect strictly after the parent block and at
    /// or before the new block's timestamp.
    pub fn upgrades_between(&self, parent_time: u64, time: u64) -> Vec<&PrecompileUpgrade> {
        self.precompile_upgrades
            .iter()
            .filter(|upgrade| upgrade.activate_at > parent_time && upgrade.activate_at <= time)
            .collect()
    }

    /// Snapshot of the fork flags for a block at `(number, time)`.
    pub fn rules(&self, number: u64, time: u64) -> Rules {
        Rules {
            chain_id: self.chain_id,
            is_eip155: self.is_eip155(number),
            is_apricot_phase1: self.is_apricot_phase1(time),
            is_apricot_phase3: self.is_apricot_phase3(time),
            is_cortina: self.is_cortina(time),
            is_durango: self.is_durango(time),
            is_cancun: self.is_cancun(number, time),
        }
    }
}

/// Fork flags evaluated for one block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rules {
    pub chain_id: u64,
    pub is_eip155: bool,
    pub is_apricot_phase1: bool,
    pub is_apricot_phase3: bool,
    pub is_cortina: bool,
    pub is_durango: bool,
    pub is_cancun: bool,
}
