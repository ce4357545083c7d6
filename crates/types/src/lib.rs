#![forbid(unsafe_code)]
#![deny(trivial_casts, trivial_numeric_casts)]

//! Core data types shared across the Cerulean workspace.
//!
//! This crate defines the block, transaction, and receipt model used by the
//! block assembler, the fork-activation schedule, and the typed wire messages
//! exchanged over the peer request network. It deliberately contains no I/O:
//! state access, transaction execution, and consensus finalization are
//! capability traits defined where they are consumed.

pub mod aliases;
pub mod block;
pub mod codec;
pub mod config;
pub mod constants;
pub mod gas_pool;
pub mod message;
pub mod node_id;
pub mod predicate;
pub mod receipt;
pub mod signer;
pub mod transaction;

pub use aliases::{Address, BlockNumber, Bytes, B256, U256};
pub use block::{Block, Header};
pub use codec::{BincodeCodec, Codec, CodecError};
pub use config::{ChainConfig, PrecompileUpgrade, Rules};
pub use constants::{MAX_BLOB_GAS_PER_BLOCK, TARGET_TX_SIZE, TX_GAS};
pub use gas_pool::{GasPool, GasPoolError};
pub use node_id::{NodeId, NodeVersion};
pub use predicate::{PredicateContext, PredicateResults, TxPredicateResults};
pub use receipt::{Log, Receipt};
pub use signer::{Signer, SignerError};
pub use transaction::{BlobSidecar, LazyTransaction, Transaction, TxPayload, TxResolver, TxType};
