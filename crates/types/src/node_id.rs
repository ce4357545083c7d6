//! Identities and versions of validator-network peers.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A peer's node identity on the validator network.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId([u8; Self::LENGTH]);

impl NodeId {
    const LENGTH: usize = 20;

    /// The zero id. Never a valid request target.
    pub const EMPTY: Self = Self([0; Self::LENGTH]);

    pub const fn new(value: [u8; Self::LENGTH]) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn repeat_byte(byte: u8) -> Self {
        Self([byte; Self::LENGTH])
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    pub fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeID-")?;
        for byte in self.0.iter() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// Application version advertised by a peer on connection. Ordering is
/// lexicographic over `(major, minor, patch)`.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl NodeVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }
}

impl fmt::Display for NodeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for NodeVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim_start_matches('v').split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(format!("malformed version {s:?}"));
        };
        let parse =
            |part: &str| part.parse::<u32>().map_err(|e| format!("malformed version {s:?}: {e}"));
        Ok(Self { major: parse(major)?, minor: parse(minor)?, patch: parse(patch)? })
    }
}
