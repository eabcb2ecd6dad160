//! Channel hub configuration

use std::time::Duration;

/// Reconnection and lifecycle policy for one channel hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum reconnect attempts per source loss before giving up
    pub max_retries: u32,

    /// Backoff before the first reconnect attempt; doubles per attempt
    pub retry_backoff: Duration,

    /// Upper bound on the reconnect backoff
    pub max_backoff: Duration,

    /// Close all output streams when the source is lost for good
    ///
    /// When `false` (the default) output streams are kept idle so players
    /// stay connected across an operator-driven source restart.
    pub close_outputs_on_source_lost: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_retries: 6,
            retry_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            close_outputs_on_source_lost: false,
        }
    }
}

impl HubConfig {
    /// Set the maximum reconnect attempts per source loss
    pub fn max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Set the initial reconnect backoff
    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Set the backoff upper bound
    pub fn max_backoff(mut self, max: Duration) -> Self {
        self.max_backoff = max;
        self
    }

    /// Close all output streams on retry exhaustion
    pub fn close_outputs_on_source_lost(mut self) -> Self {
        self.close_outputs_on_source_lost = true;
        self
    }

    /// Backoff before reconnect attempt `attempt` (1-based)
    pub(crate) fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.retry_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}
