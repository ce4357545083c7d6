//! Transaction model.
//!
//! Cerulean distinguishes three payload families: legacy gas-priced
//! transactions, dynamic-fee transactions bidding a tip above the block base
//! fee, and blob transactions that additionally carry large data blobs charged
//! against the per-block blob-gas budget. The sender is recovered and recorded
//! at pool admission; signature schemes themselves are outside this crate.
//!
//! [`LazyTransaction`] is the handle the transaction pool hands to the block
//! assembler: it exposes just enough (hash, gas, blob gas, fee caps) to drive
//! priority ordering and budget checks, and resolves to the full transaction
//! only when the assembler has decided to execute it. The pool may evict the
//! transaction in between, in which case resolution returns `None`.

use std::{fmt, sync::Arc};

use alloy_primitives::keccak256;
use serde::{Deserialize, Serialize};

use crate::{
    aliases::{Address, Bytes, KzgBytes, B256, U256},
    constants::BLOB_GAS_PER_BLOB,
};

/// Transaction payload family.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TxType {
    Legacy,
    DynamicFee,
    Blob,
}

/// Per-family pricing and blob data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxPayload {
    Legacy {
        gas_price: U256,
    },
    DynamicFee {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
    Blob {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
        max_fee_per_blob_gas: U256,
        blob_hashes: Vec<B256>,
        /// Present while the transaction sits in the pool; stripped when the
        /// transaction is stored in a block body.
        sidecar: Option<BlobSidecar>,
    },
}

/// Blob data accompanying a blob transaction.
///
/// The sidecar is not part of the execution payload and never enters the block
/// body; it is retained separately for the data-availability layer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobSidecar {
    pub blobs: Vec<Bytes>,
    pub commitments: Vec<KzgBytes>,
    pub proofs: Vec<KzgBytes>,
}

/// An access-list entry naming an address and the storage keys the transaction
/// intends to touch. Predicate precompiles are addressed through these
/// entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessListItem {
    pub address: Address,
    pub storage_keys: Vec<B256>,
}

/// A pool transaction with its recovered sender.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    chain_id: Option<u64>,
    nonce: u64,
    gas_limit: u64,
    to: Option<Address>,
    value: U256,
    input: Bytes,
    access_list: Vec<AccessListItem>,
    payload: TxPayload,
    from: Address,
    hash: B256,
    size: u64,
}

/// Canonical byte view used for hashing and size accounting. Excludes the
/// sidecar so that stripping it leaves the hash unchanged.
#[derive(Serialize)]
struct TxView<'a> {
    chain_id: Option<u64>,
    nonce: u64,
    gas_limit: u64,
    to: Option<&'a Address>,
    value: &'a U256,
    input: &'a [u8],
    access_list: &'a [AccessListItem],
    payload: PayloadView<'a>,
    from: &'a Address,
}

#[derive(Serialize)]
enum PayloadView<'a> {
    Legacy {
        gas_price: &'a U256,
    },
    DynamicFee {
        max_fee_per_gas: &'a U256,
        max_priority_fee_per_gas: &'a U256,
    },
    Blob {
        max_fee_per_gas: &'a U256,
        max_priority_fee_per_gas: &'a U256,
        max_fee_per_blob_gas: &'a U256,
        blob_hashes: &'a [B256],
    },
}

impl Transaction {
    pub fn new(from: Address, nonce: u64, gas_limit: u64, payload: TxPayload) -> Self {
        let mut tx = Self {
            chain_id: None,
            nonce,
            gas_limit,
            to: None,
            value: U256::ZERO,
            input: Bytes::new(),
            access_list: Vec::new(),
            payload,
            from,
            hash: B256::ZERO,
            size: 0,
        };
        tx.refresh();
        tx
    }

    /// Legacy gas-priced transaction. Unprotected until a chain id is set.
    pub fn legacy(from: Address, nonce: u64, gas_limit: u64, gas_price: U256) -> Self {
        Self::new(from, nonce, gas_limit, TxPayload::Legacy { gas_price })
    }

    /// Dynamic-fee transaction bidding `max_priority_fee_per_gas` above the
    /// block base fee, capped at `max_fee_per_gas` in total.
    pub fn dynamic_fee(
        from: Address,
        nonce: u64,
        gas_limit: u64,
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    ) -> Self {
        Self::new(
            from,
            nonce,
            gas_limit,
            TxPayload::DynamicFee { max_fee_per_gas, max_priority_fee_per_gas },
        )
    }

    /// Blob transaction carrying `sidecar` data blobs.
    #[allow(clippy::too_many_arguments)]
    pub fn blob(
        from: Address,
        nonce: u64,
        gas_limit: u64,
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
        max_fee_per_blob_gas: U256,
        blob_hashes: Vec<B256>,
        sidecar: BlobSidecar,
    ) -> Self {
        Self::new(
            from,
            nonce,
            gas_limit,
            TxPayload::Blob {
                max_fee_per_gas,
                max_priority_fee_per_gas,
                max_fee_per_blob_gas,
                blob_hashes,
                sidecar: Some(sidecar),
            },
        )
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self.refresh();
        self
    }

    pub fn with_to(mut self, to: Address) -> Self {
        self.to = Some(to);
        self.refresh();
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self.refresh();
        self
    }

    pub fn with_input(mut self, input: Bytes) -> Self {
        self.input = input;
        self.refresh();
        self
    }

    pub fn with_access_list(mut self, access_list: Vec<AccessListItem>) -> Self {
        self.access_list = access_list;
        self.refresh();
        self
    }

    fn refresh(&mut self) {
        let payload = match &self.payload {
            TxPayload::Legacy { gas_price } => PayloadView::Legacy { gas_price },
            TxPayload::DynamicFee { max_fee_per_gas, max_priority_fee_per_gas } => {
                PayloadView::DynamicFee { max_fee_per_gas, max_priority_fee_per_gas }
            }
            TxPayload::Blob {
                max_fee_per_gas,
                max_priority_fee_per_gas,
                max_fee_per_blob_gas,
                blob_hashes,
                ..
            } => PayloadView::Blob {
                max_fee_per_gas,
                max_priority_fee_per_gas,
                max_fee_per_blob_gas,
                blob_hashes,
            },
        };
        let view = TxView {
            chain_id: self.chain_id,
            nonce: self.nonce,
            gas_limit: self.gas_limit,
            to: self.to.as_ref(),
            value: &self.value,
            input: self.input.as_ref(),
            access_list: &self.access_list,
            payload,
            from: &self.from,
        };
        let encoded = bincode::serialize(&view)
            .expect("encoding an in-memory transaction view cannot fail");
        self.hash = keccak256(&encoded);
        self.size = encoded.len() as u64;
    }

    pub fn tx_type(&self) -> TxType {
        match self.payload {
            TxPayload::Legacy { .. } => TxType::Legacy,
            TxPayload::DynamicFee { .. } => TxType::DynamicFee,
            TxPayload::Blob { .. } => TxType::Blob,
        }
    }

    pub fn hash(&self) -> B256 {
        self.hash
    }

    /// Encoded size used for the block's cumulative size budget.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn from(&self) -> Address {
        self.from
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn gas(&self) -> u64 {
        self.gas_limit
    }

    pub fn to(&self) -> Option<Address> {
        self.to
    }

    pub fn value(&self) -> U256 {
        self.value
    }

    pub fn input(&self) -> &Bytes {
        &self.input
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    pub fn access_list(&self) -> &[AccessListItem] {
        &self.access_list
    }

    /// Maximum total price per gas unit this transaction will pay.
    pub fn gas_fee_cap(&self) -> U256 {
        match &self.payload {
            TxPayload::Legacy { gas_price } => *gas_price,
            TxPayload::DynamicFee { max_fee_per_gas, .. }
            | TxPayload::Blob { max_fee_per_gas, .. } => *max_fee_per_gas,
        }
    }

    /// Maximum tip per gas unit above the base fee.
    pub fn gas_tip_cap(&self) -> U256 {
        match &self.payload {
            TxPayload::Legacy { gas_price } => *gas_price,
            TxPayload::DynamicFee { max_priority_fee_per_gas, .. }
            | TxPayload::Blob { max_priority_fee_per_gas, .. } => *max_priority_fee_per_gas,
        }
    }

    /// Actual tip per gas unit against `base_fee`:
    /// `min(gas_tip_cap, gas_fee_cap - base_fee)`. `None` if the fee cap
    /// cannot cover the base fee at all.
    pub fn effective_gas_tip(&self, base_fee: Option<u64>) -> Option<U256> {
        effective_gas_tip(self.gas_fee_cap(), self.gas_tip_cap(), base_fee)
    }

    /// Whether the transaction commits to a chain id. Typed transactions are
    /// always protected; legacy transactions only once signed with a chain id.
    pub fn is_protected(&self) -> bool {
        match self.payload {
            TxPayload::Legacy { .. } => self.chain_id.is_some(),
            _ => true,
        }
    }

    pub fn blob_hashes(&self) -> &[B256] {
        match &self.payload {
            TxPayload::Blob { blob_hashes, .. } => blob_hashes,
            _ => &[],
        }
    }

    /// Blob gas consumed by this transaction; zero for non-blob payloads.
    pub fn blob_gas(&self) -> u64 {
        self.blob_hashes().len() as u64 * BLOB_GAS_PER_BLOB
    }

    pub fn sidecar(&self) -> Option<&BlobSidecar> {
        match &self.payload {
            TxPayload::Blob { sidecar, .. } => sidecar.as_ref(),
            _ => None,
        }
    }

    /// A copy with the blob sidecar removed. The hash is unchanged: the
    /// sidecar is not part of the transaction identity.
    pub fn without_sidecar(&self) -> Self {
        let mut tx = self.clone();
        if let TxPayload::Blob { sidecar, .. } = &mut tx.payload {
            *sidecar = None;
        }
        tx
    }
}

fn effective_gas_tip(fee_cap: U256, tip_cap: U256, base_fee: Option<u64>) -> Option<U256> {
    let base_fee = U256::from(base_fee.unwrap_or(0));
    let headroom = fee_cap.checked_sub(base_fee)?;
    Some(headroom.min(tip_cap))
}

/// Resolves a pool handle back to the full transaction, if it is still there.
pub trait TxResolver: Send + Sync {
    fn resolve(&self, hash: &B256) -> Option<Arc<Transaction>>;
}

/// A cheap handle onto a pooled transaction.
#[derive(Clone)]
pub struct LazyTransaction {
    pub hash: B256,
    pub gas: u64,
    pub blob_gas: u64,
    pub gas_fee_cap: U256,
    pub gas_tip_cap: U256,
    resolver: Arc<dyn TxResolver>,
}

impl LazyTransaction {
    pub fn new(tx: &Transaction, resolver: Arc<dyn TxResolver>) -> Self {
        Self {
            hash: tx.hash(),
            gas: tx.gas(),
            blob_gas: tx.blob_gas(),
            gas_fee_cap: tx.gas_fee_cap(),
            gas_tip_cap: tx.gas_tip_cap(),
            resolver,
        }
    }

    /// A handle that always resolves to the given transaction. Useful for
    /// pools that do not evict between peek and resolve, and for tests.
    pub fn pinned(tx: Arc<Transaction>) -> Self {
        Self::new(tx.as_ref(), Arc::new(Pinned(tx.clone())))
    }

    /// Fetch the full transaction from the pool. `None` means the pool
    /// evicted it after this handle was created.
    pub fn resolve(&self) -> Option<Arc<Transaction>> {
        self.resolver.resolve(&self.hash)
    }

    /// Effective tip computed from the handle's fee caps, without resolving.
    pub fn effective_gas_tip(&self, base_fee: Option<u64>) -> Option<U256> {
        effective_gas_tip(self.gas_fee_cap, self.gas_tip_cap, base_fee)
    }
}

impl fmt::Debug for LazyTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyTransaction")
            .field("hash", &self.hash)
            .field("gas", &self.gas)
            .field("blob_gas", &self.blob_gas)
            .finish_non_exhaustive()
    }
}

struct Pinned(Arc<Transaction>);

impl TxResolver for Pinned {
    fn resolve(&self, _hash: &B256) -> Option<Arc<Transaction>> {
        Some(self.0.clone())
    }
}
