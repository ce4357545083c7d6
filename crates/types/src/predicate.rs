//! Predicate bookkeeping for block assembly.
//!
//! Predicates are per-transaction precompile checks evaluated before the
//! transaction is applied. Their results are exposed to the execution context
//! of every later transaction in the block, and the accumulated map is
//! serialized into the header's extra-data at finalization so that verifiers
//! can re-derive the same execution context.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    aliases::{Address, Bytes, B256},
    codec::CodecError,
};

/// Input shared by all predicate checks in one block: the validator-set
/// snapshot height the checks are evaluated against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateContext {
    pub validator_set_height: u64,
}

/// Results of the predicate checks for a single transaction, keyed by the
/// precompile address that was consulted.
pub type TxPredicateResults = BTreeMap<Address, Bytes>;

/// Accumulated predicate results for a block under construction.
///
/// Entries are added as transactions are admitted. When a transaction is
/// dropped after execution failed, its entry must be removed the same way the
/// gas pool and the state snapshot are rolled back; these results live outside
/// the state abstraction, so that rollback is explicit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateResults {
    results: BTreeMap<B256, TxPredicateResults>,
}

impl PredicateResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tx_results(&mut self, tx_hash: B256, results: TxPredicateResults) {
        self.results.insert(tx_hash, results);
    }

    pub fn delete_tx_results(&mut self, tx_hash: &B256) {
        self.results.remove(tx_hash);
    }

    pub fn get_tx_results(&self, tx_hash: &B256) -> Option<&TxPredicateResults> {
        self.results.get(tx_hash)
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Canonical encoding appended to the header extra-data. Deterministic:
    /// the maps are ordered.
    pub fn to_bytes(&self) -> Result<Bytes, CodecError> {
        Ok(bincode::serialize(self).map_err(CodecError::Encode)?.into())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        bincode::deserialize(bytes).map_err(CodecError::Decode)
    }
}
