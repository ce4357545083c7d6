//! Fee-priority iteration over per-sender pending transactions.
//!
//! The pool hands the assembler a mapping from sender to that sender's
//! transactions in nonce order. Only the head of each sender's list is
//! executable next, so the merger keeps a binary heap over the heads, keyed by
//! effective tip against the block's base fee, and re-feeds the heap as heads
//! are consumed. Ties are broken by sender address so the iteration order is
//! deterministic for a given input.
//!
//! The merger never resolves a full transaction; callers peek the cheap
//! handle, run their budget checks, and only then resolve.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, VecDeque},
};

use cerulean_types::{Address, LazyTransaction, U256};

struct HeapEntry {
    tip: U256,
    sender: Address,
    tx: LazyTransaction,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.tip == other.tip && self.sender == other.sender
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap on tip; on equal tips the lower sender address ranks
        // first.
        self.tip.cmp(&other.tip).then_with(|| other.sender.cmp(&self.sender))
    }
}

/// Two-level priority iterator over pending transactions.
pub struct TransactionsByPriceAndNonce {
    txs: HashMap<Address, VecDeque<LazyTransaction>>,
    heads: BinaryHeap<HeapEntry>,
    base_fee: Option<u64>,
}

impl TransactionsByPriceAndNonce {
    /// Build the merger from per-sender nonce-ordered lists. A sender whose
    /// head cannot cover the base fee is dropped entirely: none of its later
    /// transactions are executable either.
    pub fn new(
        pending: HashMap<Address, Vec<LazyTransaction>>,
        base_fee: Option<u64>,
    ) -> Self {
        let mut txs = HashMap::with_capacity(pending.len());
        let mut heads = BinaryHeap::with_capacity(pending.len());
        for (sender, list) in pending {
            let mut queue: VecDeque<LazyTransaction> = list.into();
            let Some(head) = queue.pop_front() else { continue };
            if let Some(tip) = head.effective_gas_tip(base_fee) {
                heads.push(HeapEntry { tip, sender, tx: head });
                txs.insert(sender, queue);
            }
        }
        Self { txs, heads, base_fee }
    }

    /// The best transaction across all senders, without consuming it.
    pub fn peek(&self) -> Option<(LazyTransaction, U256)> {
        self.heads.peek().map(|entry| (entry.tx.clone(), entry.tip))
    }

    /// Advance the current best sender to its next transaction. Used after
    /// the head was consumed, successfully or as stale (nonce too low).
    pub fn shift(&mut self) {
        let Some(entry) = self.heads.pop() else { return };
        if let Some(queue) = self.txs.get_mut(&entry.sender) {
            if let Some(next) = queue.pop_front() {
                if let Some(tip) = next.effective_gas_tip(self.base_fee) {
                    self.heads.push(HeapEntry { tip, sender: entry.sender, tx: next });
                    return;
                }
            }
            self.txs.remove(&entry.sender);
        }
    }

    /// Remove the current best sender and all of its remaining transactions.
    /// Used when the head failed in a way that invalidates the rest of the
    /// sender's sequence.
    pub fn pop(&mut self) {
        if let Some(entry) = self.heads.pop() {
            self.txs.remove(&entry.sender);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    /// Drop everything. Used when a block-level budget (blob gas) is
    /// exhausted and no transaction from this merger can fit anymore.
    pub fn clear(&mut self) {
        self.heads.clear();
        self.txs.clear();
    }
}
