//! Sender recovery scheme for a given block.
//!
//! Signature verification happens at pool admission, outside this crate; the
//! signer here enforces the fork-dependent envelope rules: a transaction
//! committed to another chain's id must never be packed, and typed
//! transactions are only meaningful once replay protection is active.

use thiserror::Error;

use crate::{
    aliases::Address,
    config::ChainConfig,
    transaction::{Transaction, TxType},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("invalid chain id for signer (have {have:?}, want {want})")]
    InvalidChainId { have: Option<u64>, want: u64 },
    #[error("transaction type {0:?} not supported by signer")]
    UnsupportedTxType(TxType),
}

/// Sender recovery valid for one header's `(number, time)`.
#[derive(Clone, Copy, Debug)]
pub struct Signer {
    chain_id: u64,
    accepts_typed: bool,
}

impl Signer {
    pub fn new(config: &ChainConfig, number: u64, time: u64) -> Self {
        let rules = config.rules(number, time);
        Self {
            chain_id: config.chain_id,
            // Typed (dynamic-fee, blob) envelopes arrived with the dynamic
            // fee fork; a signer for an older block cannot admit them.
            accepts_typed: rules.is_apricot_phase3,
        }
    }

    /// The sender of `tx`, after checking the envelope is valid under this
    /// signer's rules.
    pub fn sender(&self, tx: &Transaction) -> Result<Address, SignerError> {
        if tx.tx_type() != TxType::Legacy && !self.accepts_typed {
            return Err(SignerError::UnsupportedTxType(tx.tx_type()));
        }
        if tx.is_protected() && tx.chain_id() != Some(self.chain_id) {
            return Err(SignerError::InvalidChainId { have: tx.chain_id(), want: self.chain_id });
        }
        Ok(tx.from())
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}
