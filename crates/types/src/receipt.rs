//! Execution receipts and logs.

use serde::{Deserialize, Serialize};

use crate::aliases::{Address, Bytes, B256};

/// A log emitted during transaction execution. The block hash is stamped in
/// once the block is assembled and its hash is known.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_hash: Option<B256>,
}

/// The receipt produced by applying one transaction.
///
/// Block location fields (`block_hash`, `block_number`, `transaction_index`)
/// are unset while the block is being built and stamped during finalization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub success: bool,
    pub tx_hash: B256,
    pub gas_used: u64,
    /// Cumulative gas used in the block up to and including this transaction.
    pub cumulative_gas_used: u64,
    pub blob_gas_used: u64,
    pub logs: Vec<Log>,
    pub block_hash: Option<B256>,
    pub block_number: Option<u64>,
    pub transaction_index: Option<u64>,
}
