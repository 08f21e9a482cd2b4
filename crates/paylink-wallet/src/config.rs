//! Executor configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default finality wait in milliseconds
pub const DEFAULT_FINALITY_TIMEOUT_MS: u64 = 60_000;

/// Settlement executor configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Milliseconds to wait for finality before reporting a timeout
    pub finality_timeout_ms: u64,
    /// Compare the recipient balance before and after settlement
    pub verify_balance: bool,
}

impl ExecutorConfig {
    /// Finality wait as a [`Duration`]
    pub fn finality_timeout(&self) -> Duration {
        Duration::from_millis(self.finality_timeout_ms)
    }

    /// Set the finality wait, saturating at `u64::MAX` milliseconds
    pub fn with_finality_timeout(mut self, timeout: Duration) -> Self {
        self.finality_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Enable or disable recipient balance verification
    pub fn with_verify_balance(mut self, verify_balance: bool) -> Self {
        self.verify_balance = verify_balance;
        self
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            finality_timeout_ms: DEFAULT_FINALITY_TIMEOUT_MS,
            verify_balance: false,
        }
    }
}
