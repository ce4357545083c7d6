#![forbid(unsafe_code)]
#![deny(trivial_casts, trivial_numeric_casts)]

//! Block assembly for Cerulean.
//!
//! Given the current chain head and the pool of pending transactions, the
//! [`Worker`] derives the next header under the active fork rules, packs
//! transactions in fee-priority order against the block's gas, blob-gas, and
//! size budgets, executes them with snapshot/revert discipline, and hands the
//! result to the consensus engine for finalization.
//!
//! Everything the worker touches outside its own scratchpad is a capability
//! trait ([`Chain`], [`TxPool`], [`ConsensusEngine`], [`Executor`],
//! [`StateDb`]): the worker owns no chain state and holds no locks beyond the
//! one guarding its coinbase.

pub mod clock;
pub mod error;
pub mod metrics;
pub mod ordering;
pub mod traits;
pub mod worker;

pub use clock::{Clock, SystemClock};
pub use error::{ChainError, EngineError, ExecutionError, MinerError};
pub use metrics::MinerMetrics;
pub use ordering::TransactionsByPriceAndNonce;
pub use traits::{
    BlockContext, Chain, ConsensusEngine, Executor, PendingFilter, StateDb, TxPool,
};
pub use worker::{MinerConfig, Worker};
