//! Block and header types.
//!
//! The header is the standard execution-layer header from `alloy_consensus`;
//! Cerulean builds it field by field during block assembly and relies on its
//! canonical RLP hashing. The block body carries Cerulean's own transaction
//! type, with blob sidecars stored out of band.

use crate::{
    aliases::{B256, U256},
    receipt::Receipt,
    transaction::Transaction,
};

/// Execution-layer block header.
pub type Header = alloy_consensus::Header;

/// An assembled block: the finalized header plus the ordered transaction list.
///
/// Blob transactions appear here with their sidecars stripped; the sidecars
/// travel separately to the data-availability layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    header: Header,
    transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(header: Header, transactions: Vec<Transaction>) -> Self {
        Self { header, transactions }
    }

    /// Keccak hash of the RLP-encoded header.
    pub fn hash(&self) -> B256 {
        self.header.hash_slow()
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn gas_used(&self) -> u64 {
        self.header.gas_used
    }

    pub fn base_fee(&self) -> Option<u64> {
        self.header.base_fee_per_gas
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Total fees paid to the block producer, in wei.
    ///
    /// Post-fee-fork the producer payment per transaction is
    /// `(base_fee + effective_tip) * gas_used`; before activation it is
    /// `gas_price * gas_used`. Transactions and receipts must be in the same
    /// order.
    pub fn total_fees(&self, receipts: &[Receipt]) -> U256 {
        let mut fees = U256::ZERO;
        for (tx, receipt) in self.transactions.iter().zip(receipts) {
            let miner_fee = match self.base_fee() {
                Some(base_fee) => {
                    let tip = tx.effective_gas_tip(Some(base_fee)).unwrap_or(U256::ZERO);
                    U256::from(base_fee) + tip
                }
                None => tx.gas_fee_cap(),
            };
            fees += U256::from(receipt.gas_used) * miner_fee;
        }
        fees
    }
}
