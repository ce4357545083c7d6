//! Capability seams consumed by the block assembler.
//!
//! The worker never owns the chain, the pool, or the execution engine; it is
//! handed these capabilities at construction. There are no back-references
//! from the capabilities to the worker, so no ownership cycles exist.

use std::collections::HashMap;

use cerulean_types::{
    Address, Block, ChainConfig, GasPool, Header, LazyTransaction, PredicateContext,
    PredicateResults, Receipt, Rules, Transaction, TxPredicateResults, B256, U256,
};

use crate::error::{ChainError, EngineError, ExecutionError};

/// Mutable account/storage view for one block build.
///
/// Snapshots are opaque journal positions: reverting restores the exact
/// logical state at the time the snapshot was taken. The trie prefetcher is an
/// optimization hook; implementations may ignore it.
pub trait StateDb {
    fn snapshot(&mut self) -> usize;
    fn revert_to_snapshot(&mut self, id: usize);
    /// Record which transaction subsequent state writes belong to, for log
    /// and receipt indexing.
    fn set_tx_context(&mut self, tx_hash: B256, tx_index: usize);
    fn start_prefetcher(&mut self, name: &str, parallelism: usize);
    fn stop_prefetcher(&mut self);
    fn root(&self) -> B256;
}

/// Read access to the canonical chain.
pub trait Chain: Send + Sync {
    fn current_block(&self) -> Header;
    fn state_at(&self, root: B256) -> Result<Box<dyn StateDb>, ChainError>;
    fn has_block(&self, hash: &B256, number: u64) -> bool;
    /// Worker-thread count for the trie prefetcher.
    fn prefetcher_parallelism(&self) -> usize;
}

/// Fee-based pre-filter for querying pending transactions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingFilter {
    pub min_tip: U256,
    pub base_fee: Option<u64>,
    pub blob_fee: Option<u128>,
    pub only_plain_txs: bool,
    pub only_blob_txs: bool,
}

/// Query surface of the transaction pool.
pub trait TxPool: Send + Sync {
    /// Pending transactions satisfying `filter`, grouped per sender in nonce
    /// order.
    fn pending(&self, filter: PendingFilter) -> HashMap<Address, Vec<LazyTransaction>>;
    /// Accounts whose transactions were submitted to this node directly.
    fn locals(&self) -> Vec<Address>;
    /// The pool's configured minimum tip.
    fn gas_tip(&self) -> U256;
}

/// Hooks of the external consensus engine.
pub trait ConsensusEngine: Send + Sync {
    /// Engine-specific header preparation (difficulty, engine fields).
    fn prepare(&self, chain: &dyn Chain, header: &mut Header) -> Result<(), EngineError>;

    /// The fork's dynamic-fee algorithm: the rollup window bytes destined for
    /// the header's extra-data, and the base fee.
    fn calc_base_fee(
        &self,
        config: &ChainConfig,
        parent: &Header,
        timestamp: u64,
    ) -> Result<(cerulean_types::Bytes, u64), EngineError>;

    /// Run post-transaction state modifications, compute final roots, and
    /// assemble the block.
    fn finalize_and_assemble(
        &self,
        chain: &dyn Chain,
        header: &mut Header,
        parent: &Header,
        state: &mut dyn StateDb,
        txs: &[Transaction],
        receipts: &[Receipt],
    ) -> Result<Block, EngineError>;
}

/// Execution context for one transaction within the block being built.
///
/// Exposes the accumulated predicate results so predicate precompiles observe
/// the same answers during execution that were computed at admission.
#[derive(Clone, Copy, Debug)]
pub struct BlockContext<'a> {
    pub coinbase: Address,
    pub predicate_results: Option<&'a PredicateResults>,
}

impl<'a> BlockContext<'a> {
    pub fn new(coinbase: Address) -> Self {
        Self { coinbase, predicate_results: None }
    }

    pub fn with_predicate_results(coinbase: Address, results: &'a PredicateResults) -> Self {
        Self { coinbase, predicate_results: Some(results) }
    }
}

/// The EVM-side contract consumed by block assembly.
pub trait Executor: Send + Sync {
    /// Apply one transaction to `state`, drawing from `gas_pool` and
    /// accumulating gas into `header.gas_used`. Implementations must leave
    /// partial effects in place on error; the caller owns snapshot/revert.
    #[allow(clippy::too_many_arguments)]
    fn apply_transaction(
        &self,
        config: &ChainConfig,
        chain: &dyn Chain,
        block_ctx: &BlockContext<'_>,
        gas_pool: &mut GasPool,
        state: &mut dyn StateDb,
        header: &mut Header,
        tx: &Transaction,
    ) -> Result<Receipt, ExecutionError>;

    /// Evaluate the predicate precompiles referenced by `tx`'s access list.
    /// Must not touch state.
    fn check_predicates(
        &self,
        rules: &Rules,
        context: &PredicateContext,
        tx: &Transaction,
    ) -> Result<TxPredicateResults, ExecutionError>;

    /// Run the beacon-root system contract before any user transaction.
    fn process_parent_beacon_root(&self, root: B256, state: &mut dyn StateDb);

    /// Apply precompile upgrades scheduled between the parent block and the
    /// new header into `state`.
    fn apply_upgrades(
        &self,
        config: &ChainConfig,
        parent_time: u64,
        header: &Header,
        state: &mut dyn StateDb,
    ) -> Result<(), ExecutionError>;
}
