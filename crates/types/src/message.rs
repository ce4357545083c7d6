//! Typed wire envelopes for the peer request network.
//!
//! Three request families cover what a syncing or verifying peer needs from
//! us: block bodies walking backwards from a hash, contract code by hash, and
//! aggregated validator signatures over a message. Gossip carries freshly
//! accepted transactions. Request ids are 32-bit; the even id space belongs to
//! this subsystem, the odd space to the coexisting fallback router.

use serde::{Deserialize, Serialize};

use crate::aliases::{Bytes, B256};

/// Fetch up to `parents + 1` block bodies, walking back from `hash` at
/// `height`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRequest {
    pub hash: B256,
    pub height: u64,
    pub parents: u16,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockResponse {
    pub blocks: Vec<Bytes>,
}

/// Fetch contract code blobs by code hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRequest {
    pub hashes: Vec<B256>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeResponse {
    pub code: Vec<Bytes>,
}

/// Fetch this node's signature share over the message with the given id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRequest {
    pub message_id: B256,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureResponse {
    pub signature: Bytes,
}

/// A request envelope addressed to this subsystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    Blocks(BlockRequest),
    Code(CodeRequest),
    Signature(SignatureRequest),
}

/// Newly accepted transactions announced to peers, pre-encoded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxGossip {
    pub txs: Vec<Bytes>,
}

/// A gossip envelope addressed to this subsystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gossip {
    Txs(TxGossip),
}
