//! Error types for block assembly.
//!
//! Only a handful of failures abort a block build; everything that concerns a
//! single transaction is consumed inside the commit loop (shift or pop) and
//! surfaces at trace/debug level only.

use cerulean_types::{CodecError, GasPoolError, B256};
use thiserror::Error;

/// An opaque error from the external consensus engine.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct EngineError(pub String);

impl EngineError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Errors from the chain backend while setting up a build environment.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("state unavailable for root {0}")]
    StateUnavailable(B256),
    #[error("chain backend: {0}")]
    Backend(String),
}

/// Fatal block-assembly errors.
#[derive(Debug, Error)]
pub enum MinerError {
    #[error("cannot mine without etherbase")]
    MissingEtherbase,
    #[error("failed to calculate new base fee: {0}")]
    BaseFee(#[source] EngineError),
    #[error("failed to prepare header for mining: {0}")]
    Prepare(#[source] EngineError),
    #[error("failed to create new current environment: {0}")]
    Environment(#[from] ChainError),
    #[error("failed to configure precompiles for new block: {0}")]
    ApplyUpgrades(#[source] ExecutionError),
    #[error("failed to marshal predicate results: {0}")]
    PredicateEncoding(#[from] CodecError),
    #[error("failed to finalize and assemble block: {0}")]
    Finalize(#[source] EngineError),
    #[error("produced duplicate block (hash {hash}, number {number})")]
    DuplicateBlock { hash: B256, number: u64 },
}

/// Per-transaction execution outcome errors.
///
/// `NonceTooLow` makes the commit loop skip just the offending transaction;
/// every other variant drops the sender's remaining transactions for this
/// block on the nonce-too-high cascade assumption.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("nonce too low")]
    NonceTooLow,
    #[error("nonce too high")]
    NonceTooHigh,
    #[error(transparent)]
    GasPool(#[from] GasPoolError),
    #[error("max data blobs reached")]
    BlobLimitReached,
    #[error("predicate verification failed: {0}")]
    Predicate(String),
    #[error("{0}")]
    Other(String),
}
