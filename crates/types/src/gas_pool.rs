//! The per-block gas budget.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GasPoolError {
    #[error("gas limit reached (have {have}, want {want})")]
    GasLimitReached { have: u64, want: u64 },
}

/// Tracks the gas still available while packing a block. Consumed
/// monotonically by transaction execution and restored wholesale when an
/// execution is reverted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GasPool(u64);

impl GasPool {
    pub fn new(gas: u64) -> Self {
        Self(gas)
    }

    pub fn add_gas(&mut self, amount: u64) -> &mut Self {
        self.0 += amount;
        self
    }

    pub fn sub_gas(&mut self, amount: u64) -> Result<(), GasPoolError> {
        if self.0 < amount {
            return Err(GasPoolError::GasLimitReached { have: self.0, want: amount });
        }
        self.0 -= amount;
        Ok(())
    }

    pub fn gas(&self) -> u64 {
        self.0
    }

    pub fn set_gas(&mut self, gas: u64) {
        self.0 = gas;
    }
}
