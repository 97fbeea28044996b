use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Largest accepted batch size.
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Ledger configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Transactions per sealed block. `1` seals every transaction on its own.
    pub batch_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { batch_size: 10 }
    }
}

impl LedgerConfig {
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self { batch_size }
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(LedgerError::Config(format!(
                "batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.batch_size
            )));
        }
        Ok(())
    }
}
