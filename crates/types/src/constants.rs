//! Global constants shared across Cerulean crates.

// Blob-gas accounting is inherited from the EIP-4844 parameterization.
// Re-exported so other crates can depend on cerulean_types instead of alloy directly.
pub use alloy_eips::eip4844::{
    DATA_GAS_PER_BLOB as BLOB_GAS_PER_BLOB, MAX_DATA_GAS_PER_BLOCK as MAX_BLOB_GAS_PER_BLOCK,
};

/// Ceiling on the cumulative encoded size of the transactions packed into one
/// block. Leaves 256 KiB of the 2 MiB message limit for the rest of the block:
/// the wrapping header, consensus certificates, and serialization overhead.
pub const TARGET_TX_SIZE: u64 = 1792 * 1024;

/// Intrinsic gas of the cheapest possible transaction. Once the remaining gas
/// pool drops below this, no further transaction can be packed.
pub const TX_GAS: u64 = 21_000;

/// Fixed block gas limit once the Cortina upgrade is active.
pub const CORTINA_GAS_LIMIT: u64 = 15_000_000;

/// Fixed block gas limit between the ApricotPhase1 and Cortina upgrades.
/// Pre-ApricotPhase1 blocks converge toward this value elastically.
pub const APRICOT_PHASE1_GAS_LIMIT: u64 = 8_000_000;

/// Divisor bounding how far a block's gas limit may drift from its parent's.
pub const GAS_LIMIT_BOUND_DIVISOR: u64 = 1024;

/// Absolute floor for the elastic gas limit computation.
pub const MIN_GAS_LIMIT: u64 = 5_000;
