//! Tunables handed to the core by the bootstrap layer.
//!
//! The core never reads files or the environment; the binary deserializes
//! these from its own config and passes them in.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Maximum characters in one rendered view block.
const DEFAULT_MESSAGE_LIMIT: usize = 2000;

/// Headcount at which the view and join receipts warn the leaders.
const DEFAULT_HEADCOUNT_WARNING: usize = 20;

/// Larger guest counts are almost certainly typos.
const DEFAULT_MAX_GUESTS: u32 = 10;

/// Maximum retries for a rate-limited or transient platform call
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds (doubles with each retry)
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaravanSettings {
    pub message_limit: usize,
    pub headcount_warning: usize,
    pub max_guests: u32,
    pub retry: RetryPolicy,
}

impl Default for CaravanSettings {
    fn default() -> Self {
        Self {
            message_limit: DEFAULT_MESSAGE_LIMIT,
            headcount_warning: DEFAULT_HEADCOUNT_WARNING,
            max_guests: DEFAULT_MAX_GUESTS,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts. Used by tests and the console transport.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff_ms: 0,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64 << retry.saturating_sub(1).min(16);
        Duration::from_millis(self.initial_backoff_ms.saturating_mul(factor))
    }
}
