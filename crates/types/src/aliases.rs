pub type U256 = alloy_primitives::U256;
pub type B256 = alloy_primitives::B256;

pub type Address = alloy_primitives::Address;
pub type BlockHash = alloy_primitives::BlockHash;
pub type BlockNumber = alloy_primitives::BlockNumber;
pub type Bloom = alloy_primitives::Bloom;
pub type Bytes = alloy_primitives::Bytes;

/// 48-byte KZG commitment or proof, a compressed BLS12-381 G1 point.
pub type KzgBytes = alloy_primitives::FixedBytes<48>;
