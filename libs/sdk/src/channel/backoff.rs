//! Reconnection backoff
//!
//! Delay doubles per failed attempt from the base, and stops growing once the
//! attempt counter reaches the limit:
//!
//! ```text
//! attempt:  0     1     2     3     4     5+
//! delay:    1s    2s    4s    8s    16s   16s
//! ```

use std::time::Duration;

use iofog_config::service::channels::{RECONNECT_ATTEMPTS_LIMIT, RECONNECT_BACKOFF_BASE_MS};

/// Backoff parameters for one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect
    pub base_backoff_ms: u64,
    /// Attempts after which the delay saturates
    pub attempts_limit: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_backoff_ms: RECONNECT_BACKOFF_BASE_MS,
            attempts_limit: RECONNECT_ATTEMPTS_LIMIT,
        }
    }
}

impl ReconnectPolicy {
    /// Delay for the given number of prior failed attempts
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let exponent = attempts.min(self.attempts_limit.saturating_sub(1));
        let factor = 2_u64.saturating_pow(exponent);
        Duration::from_millis(self.base_backoff_ms.saturating_mul(factor))
    }
}

/// Per-channel attempt counter
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    attempts: u32,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Delay before the next reconnect; advances the counter until the limit
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.policy.delay_for(self.attempts);
        if self.attempts < self.policy.attempts_limit {
            self.attempts += 1;
        }
        delay
    }

    /// Called after a successful handshake
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
