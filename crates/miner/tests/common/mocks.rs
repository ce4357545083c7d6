//! Test doubles for the capability seams consumed by the block assembler.
//!
//! These mocks let the harness exercise the full commit loop without a real
//! chain, pool, or execution engine. The state double keeps a shared journal
//! of writes so tests can assert snapshot/revert discipline from the outside.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use cerulean_miner::{
    BlockContext, Chain, ChainError, Clock, ConsensusEngine, EngineError, ExecutionError,
    Executor, PendingFilter, StateDb, TxPool,
};
use cerulean_types::{
    Address, Block, Bytes, ChainConfig, GasPool, Header, LazyTransaction, PredicateContext,
    Receipt, Rules, Transaction, TxPredicateResults, B256, U256,
};

/// A single logical write applied to the mock state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum StateWrite {
    /// The beacon-root system contract ran.
    BeaconRoot(B256),
    /// A transaction's execution touched the state.
    Tx(B256),
}

/// Shared storage behind every `MockStateDb` handed out by `MockChain`.
#[derive(Debug, Default)]
pub(crate) struct StateCore {
    pub journal: Vec<StateWrite>,
    pub tx_contexts: Vec<(B256, usize)>,
    pub prefetcher_running: bool,
    pub prefetcher_stopped: bool,
}

#[derive(Clone, Default)]
pub(crate) struct MockStateDb {
    pub core: Arc<Mutex<StateCore>>,
    root: B256,
}

impl StateDb for MockStateDb {
    fn snapshot(&mut self) -> usize {
        self.core.lock().unwrap().journal.len()
    }

    fn revert_to_snapshot(&mut self, id: usize) {
        self.core.lock().unwrap().journal.truncate(id);
    }

    fn set_tx_context(&mut self, tx_hash: B256, tx_index: usize) {
        self.core.lock().unwrap().tx_contexts.push((tx_hash, tx_index));
    }

    fn start_prefetcher(&mut self, _name: &str, _parallelism: usize) {
        self.core.lock().unwrap().prefetcher_running = true;
    }

    fn stop_prefetcher(&mut self) {
        let mut core = self.core.lock().unwrap();
        core.prefetcher_running = false;
        core.prefetcher_stopped = true;
    }

    fn root(&self) -> B256 {
        self.root
    }
}

#[derive(Clone)]
pub(crate) struct MockChain {
    head: Arc<Mutex<Header>>,
    pub state: Arc<Mutex<StateCore>>,
    pub known_blocks: Arc<Mutex<HashSet<(B256, u64)>>>,
}

impl MockChain {
    pub(crate) fn new(head: Header) -> Self {
        Self {
            head: Arc::new(Mutex::new(head)),
            state: Arc::new(Mutex::new(StateCore::default())),
            known_blocks: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub(crate) fn insert_block(&self, block: &Block) {
        self.known_blocks.lock().unwrap().insert((block.hash(), block.number()));
    }
}

impl Chain for MockChain {
    fn current_block(&self) -> Header {
        self.head.lock().unwrap().clone()
    }

    fn state_at(&self, root: B256) -> Result<Box<dyn StateDb>, ChainError> {
        Ok(Box::new(MockStateDb { core: self.state.clone(), root }))
    }

    fn has_block(&self, hash: &B256, number: u64) -> bool {
        self.known_blocks.lock().unwrap().contains(&(*hash, number))
    }

    fn prefetcher_parallelism(&self) -> usize {
        4
    }
}

#[derive(Clone, Default)]
pub(crate) struct MockPool {
    plain: HashMap<Address, Vec<LazyTransaction>>,
    blob: HashMap<Address, Vec<LazyTransaction>>,
    locals: Vec<Address>,
}

impl MockPool {
    pub(crate) fn with_plain(mut self, sender: Address, txs: Vec<LazyTransaction>) -> Self {
        self.plain.insert(sender, txs);
        self
    }

    pub(crate) fn with_blob(mut self, sender: Address, txs: Vec<LazyTransaction>) -> Self {
        self.blob.insert(sender, txs);
        self
    }

    pub(crate) fn with_local(mut self, sender: Address) -> Self {
        self.locals.push(sender);
        self
    }
}

impl TxPool for MockPool {
    fn pending(&self, filter: PendingFilter) -> HashMap<Address, Vec<LazyTransaction>> {
        if filter.only_blob_txs {
            self.blob.clone()
        } else {
            self.plain.clone()
        }
    }

    fn locals(&self) -> Vec<Address> {
        self.locals.clone()
    }

    fn gas_tip(&self) -> U256 {
        U256::from(1)
    }
}

/// Records what finalization saw, so tests can check the txs/receipts pairing
/// without reaching into the worker's environment.
#[derive(Debug, Default)]
pub(crate) struct FinalizeRecord {
    pub tx_count: usize,
    pub receipt_count: usize,
    pub calls: usize,
}

#[derive(Clone)]
pub(crate) struct MockEngine {
    base_fee: u64,
    forced_gas_limit: Option<u64>,
    pub finalized: Arc<Mutex<FinalizeRecord>>,
}

impl MockEngine {
    pub(crate) fn new(base_fee: u64) -> Self {
        Self { base_fee, forced_gas_limit: None, finalized: Arc::new(Mutex::new(FinalizeRecord::default())) }
    }

    /// Pin the header gas limit during `prepare`, regardless of fork rules.
    pub(crate) fn with_forced_gas_limit(mut self, gas_limit: u64) -> Self {
        self.forced_gas_limit = Some(gas_limit);
        self
    }
}

impl ConsensusEngine for MockEngine {
    fn prepare(&self, _chain: &dyn Chain, header: &mut Header) -> Result<(), EngineError> {
        if let Some(gas_limit) = self.forced_gas_limit {
            header.gas_limit = gas_limit;
        }
        Ok(())
    }

    fn calc_base_fee(
        &self,
        _config: &ChainConfig,
        _parent: &Header,
        _timestamp: u64,
    ) -> Result<(Bytes, u64), EngineError> {
        // An empty fee window keeps the extra-data equal to the serialized
        // predicate results, which the tests decode.
        Ok((Bytes::new(), self.base_fee))
    }

    fn finalize_and_assemble(
        &self,
        _chain: &dyn Chain,
        header: &mut Header,
        _parent: &Header,
        _state: &mut dyn StateDb,
        txs: &[Transaction],
        receipts: &[Receipt],
    ) -> Result<Block, EngineError> {
        let mut record = self.finalized.lock().unwrap();
        record.tx_count = txs.len();
        record.receipt_count = receipts.len();
        record.calls += 1;
        Ok(Block::new(header.clone(), txs.to_vec()))
    }
}

/// Scripted outcome of executing one transaction.
#[derive(Clone, Debug)]
pub(crate) enum ExecOutcome {
    Ok { gas_used: u64 },
    NonceTooLow,
    NonceTooHigh,
    /// Scribbles on the state and burns gas before failing, to exercise the
    /// caller's revert path.
    DirtyFailure,
}

#[derive(Clone)]
pub(crate) struct MockExecutor {
    outcomes: Arc<Mutex<HashMap<B256, ExecOutcome>>>,
    predicate_failures: Arc<Mutex<HashSet<B256>>>,
    state: Arc<Mutex<StateCore>>,
}

impl MockExecutor {
    pub(crate) fn new(chain: &MockChain) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(HashMap::new())),
            predicate_failures: Arc::new(Mutex::new(HashSet::new())),
            state: chain.state.clone(),
        }
    }

    pub(crate) fn with_outcome(self, tx: &Transaction, outcome: ExecOutcome) -> Self {
        self.outcomes.lock().unwrap().insert(tx.hash(), outcome);
        self
    }

    pub(crate) fn with_predicate_failure(self, tx: &Transaction) -> Self {
        self.predicate_failures.lock().unwrap().insert(tx.hash());
        self
    }
}

impl Executor for MockExecutor {
    fn apply_transaction(
        &self,
        _config: &ChainConfig,
        _chain: &dyn Chain,
        _block_ctx: &BlockContext<'_>,
        gas_pool: &mut GasPool,
        _state: &mut dyn StateDb,
        header: &mut Header,
        tx: &Transaction,
    ) -> Result<Receipt, ExecutionError> {
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .get(&tx.hash())
            .cloned()
            .unwrap_or(ExecOutcome::Ok { gas_used: 21_000 });
        match outcome {
            ExecOutcome::Ok { gas_used } => {
                gas_pool.sub_gas(gas_used)?;
                header.gas_used += gas_used;
                self.state.lock().unwrap().journal.push(StateWrite::Tx(tx.hash()));
                Ok(Receipt {
                    success: true,
                    tx_hash: tx.hash(),
                    gas_used,
                    cumulative_gas_used: header.gas_used,
                    blob_gas_used: tx.blob_gas(),
                    logs: vec![cerulean_types::Log {
                        address: tx.from(),
                        topics: vec![tx.hash()],
                        data: Bytes::new(),
                        block_hash: None,
                    }],
                    ..Receipt::default()
                })
            }
            ExecOutcome::NonceTooLow => Err(ExecutionError::NonceTooLow),
            ExecOutcome::NonceTooHigh => Err(ExecutionError::NonceTooHigh),
            ExecOutcome::DirtyFailure => {
                self.state.lock().unwrap().journal.push(StateWrite::Tx(tx.hash()));
                gas_pool.sub_gas(10_000)?;
                Err(ExecutionError::Other("execution reverted".into()))
            }
        }
    }

    fn check_predicates(
        &self,
        _rules: &Rules,
        context: &PredicateContext,
        tx: &Transaction,
    ) -> Result<TxPredicateResults, ExecutionError> {
        if self.predicate_failures.lock().unwrap().contains(&tx.hash()) {
            return Err(ExecutionError::Predicate("predicate rejected".into()));
        }
        let mut results = TxPredicateResults::new();
        results.insert(
            Address::repeat_byte(0xee),
            Bytes::from(context.validator_set_height.to_be_bytes().to_vec()),
        );
        Ok(results)
    }

    fn process_parent_beacon_root(&self, root: B256, _state: &mut dyn StateDb) {
        self.state.lock().unwrap().journal.push(StateWrite::BeaconRoot(root));
    }

    fn apply_upgrades(
        &self,
        _config: &ChainConfig,
        _parent_time: u64,
        _header: &Header,
        _state: &mut dyn StateDb,
    ) -> Result<(), ExecutionError> {
        Ok(())
    }
}

/// Deterministic clock pinned to one unix timestamp.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_unix(&self) -> u64 {
        self.0
    }
}

/// A resolver standing in for a pool that evicted the transaction between
/// peek and resolve.
pub(crate) struct NullResolver;

impl cerulean_types::TxResolver for NullResolver {
    fn resolve(&self, _hash: &B256) -> Option<Arc<Transaction>> {
        None
    }
}
