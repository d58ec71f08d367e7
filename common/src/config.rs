use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MIN_WAIT_MS: u64 = 2000;
pub const DEFAULT_MAX_WAIT_MS: u64 = 6000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_wait_ms ({max}) is below min_wait_ms ({min})")]
    InvertedWaitInterval { min: u64, max: u64 },
}

/// Tunables for one round. Equal min/max means a fixed, non-random delay.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundConfig {
    pub min_wait_ms: u64,
    pub max_wait_ms: u64,
    /// Seed for the signal-delay draw; rounds replay deterministically from it.
    pub seed: u64,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            min_wait_ms: DEFAULT_MIN_WAIT_MS,
            max_wait_ms: DEFAULT_MAX_WAIT_MS,
            seed: 0x51C4_D12A,
        }
    }
}

impl RoundConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_wait_ms < self.min_wait_ms {
            return Err(ConfigError::InvertedWaitInterval {
                min: self.min_wait_ms,
                max: self.max_wait_ms,
            });
        }
        Ok(())
    }
}
