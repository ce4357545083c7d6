//! The block assembler.
//!
//! `Worker::commit_new_work` is the single entry point: derive the next
//! header from the current head, load the parent state, drain the pending
//! pool through two fee-priority mergers (plain and blob, each with its own
//! block-level budget), and finalize through the consensus engine. The build
//! runs entirely on the caller's thread; the worker's lock only guards the
//! coinbase.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
    time::Instant,
};

use alloy_eips::eip4844::{calc_blob_gasprice, calc_excess_blob_gas};
use cerulean_types::{
    constants::{
        APRICOT_PHASE1_GAS_LIMIT, BLOB_GAS_PER_BLOB, CORTINA_GAS_LIMIT, GAS_LIMIT_BOUND_DIVISOR,
        MAX_BLOB_GAS_PER_BLOCK, MIN_GAS_LIMIT,
    },
    Address, Block, ChainConfig, GasPool, Header, Log, PredicateContext, PredicateResults,
    Receipt, Rules, Signer, Transaction, TxType, B256, TARGET_TX_SIZE, TX_GAS,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace};

use crate::{
    clock::Clock,
    error::{ExecutionError, MinerError},
    metrics::MinerMetrics,
    ordering::TransactionsByPriceAndNonce,
    traits::{BlockContext, Chain, ConsensusEngine, Executor, PendingFilter, StateDb, TxPool},
};

/// Static miner settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerConfig {
    /// Recipient of block rewards and tips. Must be non-zero to mine.
    pub etherbase: Address,
    /// Skips the duplicate-block short circuit. Test harnesses only.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub test_only_allow_duplicate_blocks: bool,
}

/// The worker's per-block scratchpad.
struct Environment {
    signer: Signer,
    state: Box<dyn StateDb>,
    /// Transactions admitted so far this cycle.
    tcount: usize,
    gas_pool: GasPool,

    parent: Header,
    header: Header,
    txs: Vec<Transaction>,
    receipts: Vec<Receipt>,
    sidecars: Vec<cerulean_types::BlobSidecar>,
    blobs: usize,
    size: u64,

    rules: Rules,
    predicate_context: PredicateContext,
    /// Predicate answers accumulated as transactions are admitted. When a
    /// transaction is dropped, its entry must be removed the same way the gas
    /// pool and state are reset.
    predicate_results: PredicateResults,

    start: Instant,
}

/// Builds new blocks on request and submits them to the consensus engine.
pub struct Worker {
    config: MinerConfig,
    chain_config: Arc<ChainConfig>,
    engine: Arc<dyn ConsensusEngine>,
    chain: Arc<dyn Chain>,
    pool: Arc<dyn TxPool>,
    executor: Arc<dyn Executor>,
    clock: Arc<dyn Clock>,
    metrics: MinerMetrics,

    coinbase: RwLock<Address>,
    beacon_root: B256,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: MinerConfig,
        chain_config: Arc<ChainConfig>,
        engine: Arc<dyn ConsensusEngine>,
        chain: Arc<dyn Chain>,
        pool: Arc<dyn TxPool>,
        executor: Arc<dyn Executor>,
        clock: Arc<dyn Clock>,
        metrics: MinerMetrics,
    ) -> Self {
        let coinbase = RwLock::new(config.etherbase);
        Self {
            config,
            chain_config,
            engine,
            chain,
            pool,
            executor,
            clock,
            metrics,
            coinbase,
            // Retained at the zero hash for compatibility with the upstream
            // beacon-root header field.
            beacon_root: B256::ZERO,
        }
    }

    /// Set the coinbase used to initialize new block headers.
    pub fn set_etherbase(&self, addr: Address) {
        *self.coinbase.write().unwrap_or_else(PoisonError::into_inner) = addr;
    }

    /// Build the next block on top of the current head.
    pub fn commit_new_work(
        &self,
        predicate_context: PredicateContext,
    ) -> Result<Block, MinerError> {
        let coinbase = *self.coinbase.read().unwrap_or_else(PoisonError::into_inner);
        let start = Instant::now();
        let parent = self.chain.current_block();

        // Blocks are allowed to share their parent's timestamp so more than
        // one block can be produced per second.
        let mut timestamp = self.clock.now_unix();
        if parent.timestamp >= timestamp {
            timestamp = parent.timestamp;
        }

        let gas_limit = if self.chain_config.is_cortina(timestamp) {
            CORTINA_GAS_LIMIT
        } else if self.chain_config.is_apricot_phase1(timestamp) {
            APRICOT_PHASE1_GAS_LIMIT
        } else {
            // Pre-AP1 the ceiling and floor are both pinned to the AP1 limit
            // so the elastic formula converges there.
            calc_gas_limit(
                parent.gas_used,
                parent.gas_limit,
                APRICOT_PHASE1_GAS_LIMIT,
                APRICOT_PHASE1_GAS_LIMIT,
            )
        };

        let mut header = Header {
            parent_hash: parent.hash_slow(),
            number: parent.number + 1,
            gas_limit,
            timestamp,
            ..Header::default()
        };

        if self.chain_config.is_apricot_phase3(timestamp) {
            let (extra, base_fee) = self
                .engine
                .calc_base_fee(&self.chain_config, &parent, timestamp)
                .map_err(MinerError::BaseFee)?;
            header.extra_data = extra;
            header.base_fee_per_gas = Some(base_fee);
        }
        if self.chain_config.is_cancun(header.number, header.timestamp) {
            let excess_blob_gas = if self.chain_config.is_cancun(parent.number, parent.timestamp)
            {
                calc_excess_blob_gas(
                    parent.excess_blob_gas.unwrap_or(0),
                    parent.blob_gas_used.unwrap_or(0),
                )
            } else {
                // For the first post-fork block both parent fields count as
                // zero.
                calc_excess_blob_gas(0, 0)
            };
            header.blob_gas_used = Some(0);
            header.excess_blob_gas = Some(excess_blob_gas);
            header.parent_beacon_block_root = Some(self.beacon_root);
        }

        if coinbase == Address::ZERO {
            return Err(MinerError::MissingEtherbase);
        }
        header.beneficiary = coinbase;
        self.engine
            .prepare(self.chain.as_ref(), &mut header)
            .map_err(MinerError::Prepare)?;

        let mut env = self.create_environment(predicate_context, parent, header, start)?;
        let result = self.fill_and_finalize(&mut env, coinbase);
        // The prefetcher must stop on every exit path once it was started.
        env.state.stop_prefetcher();
        result
    }

    fn create_environment(
        &self,
        predicate_context: PredicateContext,
        parent: Header,
        header: Header,
        start: Instant,
    ) -> Result<Environment, MinerError> {
        let mut state = self.chain.state_at(parent.state_root)?;
        state.start_prefetcher("miner", self.chain.prefetcher_parallelism());
        let mut gas_pool = GasPool::default();
        gas_pool.add_gas(header.gas_limit);
        Ok(Environment {
            signer: Signer::new(&self.chain_config, header.number, header.timestamp),
            state,
            tcount: 0,
            gas_pool,
            rules: self.chain_config.rules(header.number, header.timestamp),
            parent,
            header,
            txs: Vec::new(),
            receipts: Vec::new(),
            sidecars: Vec::new(),
            blobs: 0,
            size: 0,
            predicate_context,
            predicate_results: PredicateResults::new(),
            start,
        })
    }

    fn fill_and_finalize(
        &self,
        env: &mut Environment,
        coinbase: Address,
    ) -> Result<Block, MinerError> {
        if let Some(root) = env.header.parent_beacon_block_root {
            self.executor.process_parent_beacon_root(root, env.state.as_mut());
        }
        // Configure any upgrades that should go into effect during this
        // block.
        if let Err(err) = self.executor.apply_upgrades(
            &self.chain_config,
            env.parent.timestamp,
            &env.header,
            env.state.as_mut(),
        ) {
            error!(
                parent = %env.header.parent_hash,
                number = env.header.number,
                timestamp = env.header.timestamp,
                %err,
                "failed to configure precompiles mining new block"
            );
            return Err(MinerError::ApplyUpgrades(err));
        }

        // Retrieve the pending transactions pre-filtered by the dynamic fees.
        let mut filter = PendingFilter {
            min_tip: self.pool.gas_tip(),
            base_fee: env.header.base_fee_per_gas,
            blob_fee: env.header.excess_blob_gas.map(calc_blob_gasprice),
            only_plain_txs: true,
            only_blob_txs: false,
        };
        let pending_plain = self.pool.pending(filter.clone());
        filter.only_plain_txs = false;
        filter.only_blob_txs = true;
        let pending_blob = self.pool.pending(filter);

        // Split the pending transactions into locals and remotes.
        let mut local_plain = HashMap::new();
        let mut remote_plain = pending_plain;
        let mut local_blob = HashMap::new();
        let mut remote_blob = pending_blob;
        for account in self.pool.locals() {
            if let Some(txs) = remote_plain.remove(&account) {
                if !txs.is_empty() {
                    local_plain.insert(account, txs);
                }
            }
            if let Some(txs) = remote_blob.remove(&account) {
                if !txs.is_empty() {
                    local_blob.insert(account, txs);
                }
            }
        }

        // Fill the block with all available pending transactions, locals
        // first. Both passes share the environment, so the remote pass sees
        // what the local pass consumed.
        let base_fee = env.header.base_fee_per_gas;
        if !local_plain.is_empty() || !local_blob.is_empty() {
            let mut plain_txs = TransactionsByPriceAndNonce::new(local_plain, base_fee);
            let mut blob_txs = TransactionsByPriceAndNonce::new(local_blob, base_fee);
            self.commit_transactions(env, &mut plain_txs, &mut blob_txs, coinbase);
        }
        if !remote_plain.is_empty() || !remote_blob.is_empty() {
            let mut plain_txs = TransactionsByPriceAndNonce::new(remote_plain, base_fee);
            let mut blob_txs = TransactionsByPriceAndNonce::new(remote_blob, base_fee);
            self.commit_transactions(env, &mut plain_txs, &mut blob_txs, coinbase);
        }

        self.commit(env)
    }

    fn commit_transactions(
        &self,
        env: &mut Environment,
        plain_txs: &mut TransactionsByPriceAndNonce,
        blob_txs: &mut TransactionsByPriceAndNonce,
        coinbase: Address,
    ) {
        loop {
            // If we don't have enough gas for any further transactions then
            // we're done.
            if env.gas_pool.gas() < TX_GAS {
                trace!(have = env.gas_pool.gas(), want = TX_GAS, "not enough gas for further transactions");
                break;
            }
            // If we don't have enough blob space for any further blob
            // transactions, skip that list altogether.
            if !blob_txs.is_empty()
                && env.blobs as u64 * BLOB_GAS_PER_BLOB >= MAX_BLOB_GAS_PER_BLOCK
            {
                trace!("not enough blob space for further blob transactions");
                blob_txs.clear();
                // Fall through to pick up any plain txs.
            }
            // Retrieve the next transaction and abort if all done.
            let (ltx, from_blob) = match (plain_txs.peek(), blob_txs.peek()) {
                (None, None) => break,
                (Some((tx, _)), None) => (tx, false),
                (None, Some((tx, _))) => (tx, true),
                (Some((plain, plain_tip)), Some((blob, blob_tip))) => {
                    if plain_tip < blob_tip {
                        (blob, true)
                    } else {
                        (plain, false)
                    }
                }
            };
            let txs = if from_blob { &mut *blob_txs } else { &mut *plain_txs };

            // If we don't have enough space for the next transaction, skip
            // the account.
            if env.gas_pool.gas() < ltx.gas {
                trace!(hash = %ltx.hash, left = env.gas_pool.gas(), needed = ltx.gas, "not enough gas left for transaction");
                txs.pop();
                continue;
            }
            let blob_gas_left = MAX_BLOB_GAS_PER_BLOCK - env.blobs as u64 * BLOB_GAS_PER_BLOB;
            if blob_gas_left < ltx.blob_gas {
                trace!(hash = %ltx.hash, left = blob_gas_left, needed = ltx.blob_gas, "not enough blob gas left for transaction");
                txs.pop();
                continue;
            }
            // Transaction seems to fit, pull it up from the pool.
            let Some(tx) = ltx.resolve() else {
                trace!(hash = %ltx.hash, "ignoring evicted transaction");
                txs.pop();
                continue;
            };
            // Abort if the transaction won't fit in the block; the pop is
            // deliberately conservative, no smaller same-sender transaction
            // is searched for.
            let total_size = env.size + tx.size();
            if total_size > TARGET_TX_SIZE {
                trace!(hash = %tx.hash(), total_size, tx_size = tx.size(), "skipping transaction that would exceed target size");
                txs.pop();
                continue;
            }
            // The envelope was already validated on pool admission.
            let from = env.signer.sender(&tx).unwrap_or_else(|_| tx.from());

            // Check whether the tx is replay protected. If we're not in the
            // EIP155-equivalent phase, ignore the sender until we are.
            if tx.is_protected() && !self.chain_config.is_eip155(env.header.number) {
                trace!(hash = %tx.hash(), eip155_block = ?self.chain_config.eip155_block, "ignoring replay protected transaction");
                txs.pop();
                continue;
            }

            // Start executing the transaction.
            env.state.set_tx_context(tx.hash(), env.tcount);

            match self.commit_transaction(env, &tx, coinbase) {
                Err(ExecutionError::NonceTooLow) => {
                    // New-head data race between the pool and the miner:
                    // only this transaction is stale.
                    trace!(hash = %tx.hash(), sender = %from, nonce = tx.nonce(), "skipping transaction with low nonce");
                    txs.shift();
                }
                Ok(_) => {
                    env.tcount += 1;
                    txs.shift();
                }
                Err(err) => {
                    // Drop all consecutive transactions from the same sender
                    // because of the nonce-too-high clause.
                    debug!(hash = %tx.hash(), %err, "transaction failed, account skipped");
                    txs.pop();
                }
            }
        }
    }

    fn commit_transaction(
        &self,
        env: &mut Environment,
        tx: &Arc<Transaction>,
        coinbase: Address,
    ) -> Result<Vec<Log>, ExecutionError> {
        if tx.tx_type() == TxType::Blob {
            return self.commit_blob_transaction(env, tx, coinbase);
        }
        let receipt = self.apply_transaction(env, tx, coinbase)?;
        let logs = receipt.logs.clone();
        env.txs.push(tx.as_ref().clone());
        env.receipts.push(receipt);
        env.size += tx.size();
        Ok(logs)
    }

    fn commit_blob_transaction(
        &self,
        env: &mut Environment,
        tx: &Arc<Transaction>,
        coinbase: Address,
    ) -> Result<Vec<Log>, ExecutionError> {
        let Some(sidecar) = tx.sidecar().cloned() else {
            // A blob transaction without its sidecar cannot come from the
            // pool; this is a programmer error, not a user error.
            panic!("blob transaction without blobs in miner");
        };
        // The blob gas limit is only checked at block validation time, not
        // during execution, so the executor will not reject an overfull block
        // on its own.
        if (env.blobs + sidecar.blobs.len()) as u64 * BLOB_GAS_PER_BLOB > MAX_BLOB_GAS_PER_BLOCK {
            return Err(ExecutionError::BlobLimitReached);
        }
        let receipt = self.apply_transaction(env, tx, coinbase)?;
        let logs = receipt.logs.clone();
        env.txs.push(tx.without_sidecar());
        env.blobs += sidecar.blobs.len();
        env.sidecars.push(sidecar);
        if let Some(blob_gas_used) = env.header.blob_gas_used.as_mut() {
            *blob_gas_used += receipt.blob_gas_used;
        }
        env.receipts.push(receipt);
        Ok(logs)
    }

    /// Run the transaction. If execution fails, state, gas pool, and the
    /// predicate results are restored to their values at entry.
    fn apply_transaction(
        &self,
        env: &mut Environment,
        tx: &Transaction,
        coinbase: Address,
    ) -> Result<Receipt, ExecutionError> {
        let snapshot = env.state.snapshot();
        let gas_before = env.gas_pool.gas();

        if env.rules.is_durango {
            // A predicate failure mutates nothing, so there is nothing to
            // revert here.
            let results = self
                .executor
                .check_predicates(&env.rules, &env.predicate_context, tx)
                .map_err(|err| {
                    debug!(hash = %tx.hash(), %err, "transaction predicate failed verification in miner");
                    err
                })?;
            env.predicate_results.set_tx_results(tx.hash(), results);
        }
        let block_ctx = if env.rules.is_durango {
            BlockContext::with_predicate_results(coinbase, &env.predicate_results)
        } else {
            BlockContext::new(coinbase)
        };

        let applied = self.executor.apply_transaction(
            &self.chain_config,
            self.chain.as_ref(),
            &block_ctx,
            &mut env.gas_pool,
            &mut *env.state,
            &mut env.header,
            tx,
        );
        match applied {
            Ok(receipt) => Ok(receipt),
            Err(err) => {
                env.state.revert_to_snapshot(snapshot);
                env.gas_pool.set_gas(gas_before);
                env.predicate_results.delete_tx_results(&tx.hash());
                Err(err)
            }
        }
    }

    /// Post-transaction modifications, final assembly, and submission checks.
    fn commit(&self, env: &mut Environment) -> Result<Block, MinerError> {
        if env.rules.is_durango {
            let predicate_bytes = env.predicate_results.to_bytes()?;
            let mut extra = env.header.extra_data.to_vec();
            extra.extend_from_slice(&predicate_bytes);
            env.header.extra_data = extra.into();
        }
        // Deep copy receipts so later stamping cannot alias the
        // environment's copies.
        let receipts = env.receipts.clone();
        let block = self
            .engine
            .finalize_and_assemble(
                self.chain.as_ref(),
                &mut env.header,
                &env.parent,
                env.state.as_mut(),
                &env.txs,
                &receipts,
            )
            .map_err(MinerError::Finalize)?;
        self.handle_result(env, block, receipts)
    }

    fn handle_result(
        &self,
        env: &Environment,
        block: Block,
        mut receipts: Vec<Receipt>,
    ) -> Result<Block, MinerError> {
        // Short circuit when receiving a duplicate result caused by
        // resubmitting.
        if !self.config.test_only_allow_duplicate_blocks
            && self.chain.has_block(&block.hash(), block.number())
        {
            return Err(MinerError::DuplicateBlock { hash: block.hash(), number: block.number() });
        }

        let hash = block.hash();
        for (index, receipt) in receipts.iter_mut().enumerate() {
            receipt.block_hash = Some(hash);
            receipt.block_number = Some(block.number());
            receipt.transaction_index = Some(index as u64);
            // The block hash is only known now, not when the individual
            // receipts were created.
            for log in &mut receipt.logs {
                log.block_hash = Some(hash);
            }
        }

        let fees = block.total_fees(&receipts);
        let elapsed = env.start.elapsed();
        self.metrics.observe_build(env.tcount, block.gas_used(), elapsed);
        info!(
            number = block.number(),
            hash = %hash,
            txs = env.tcount,
            gas = block.gas_used(),
            fees_wei = %fees,
            ?elapsed,
            "commit new mining work"
        );

        // The caller is responsible for any further verification and for
        // inserting the block into the chain.
        Ok(block)
    }
}

/// Elastic gas limit: drift from the parent limit toward the usage-driven
/// target, bounded by `GAS_LIMIT_BOUND_DIVISOR` per block and clamped into
/// `[gas_floor, gas_ceil]`.
fn calc_gas_limit(parent_gas_used: u64, parent_gas_limit: u64, gas_floor: u64, gas_ceil: u64) -> u64 {
    let delta = parent_gas_limit / GAS_LIMIT_BOUND_DIVISOR - 1;
    let contrib = (parent_gas_used + parent_gas_used / 2) / GAS_LIMIT_BOUND_DIVISOR;

    let mut limit = parent_gas_limit - delta + contrib;
    if limit < MIN_GAS_LIMIT {
        limit = MIN_GAS_LIMIT;
    }
    // If we're outside our allowed gas range, we try to hone towards them.
    if limit < gas_floor {
        limit = parent_gas_limit + delta;
        if limit > gas_floor {
            limit = gas_floor;
        }
    } else if limit > gas_ceil {
        limit = parent_gas_limit - delta;
        if limit < gas_ceil {
            limit = gas_ceil;
        }
    }
    limit
}
